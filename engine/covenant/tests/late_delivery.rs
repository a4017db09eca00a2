use covenant::calendar::{self, Calendar};
use covenant::dispatch::{self, context, fail, DISPATCH_ERROR_MESSAGE};
use covenant::duration::duration_as;
use covenant::numeric::{float_div, float_min, float_mult, float_of_nat};
use covenant::record::dot;
use covenant::registry::brand;
use covenant::sum::{either, left, to_right};
use covenant::{
    clause_from_callback, compare, unwrap_response, Contract, CovenantResult, Duration,
    DurationUnit, Edge, SubtypeRegistry, Value,
};

const REQUEST: &str = "LateDeliveryAndPenaltyRequest";
const RESPONSE: &str = "LateDeliveryAndPenaltyResponse";

fn registry() -> SubtypeRegistry {
    SubtypeRegistry::from_edges(vec![
        Edge::new(REQUEST, "Request"),
        Edge::new(RESPONSE, "Response"),
    ])
}

fn percent(amount: f64) -> Value {
    Value::float(amount / 100.0)
}

/// Penalty clause built from runtime primitives only.
fn late_delivery(context: &Value, request: &Value) -> CovenantResult<Value> {
    let contract = dot(context, "contract")?;
    let now = dot(context, "now")?.expect_datetime()?;
    let request = covenant::registry::unbrand(request)?;

    let agreed = dot(&request, "agreedDelivery")?.expect_datetime()?;
    if dot(&contract, "forceMajeure")?.expect_bool()? && dot(&request, "forceMajeure")?.expect_bool()? {
        return Ok(left(brand(
            [RESPONSE],
            Value::record([("penalty", Value::float(0.0)), ("buyerMayTerminate", Value::Bool(true))]),
        )?));
    }
    if calendar::is_after(&agreed, &now) {
        return Ok(fail("Cannot exercise late delivery before delivery date"));
    }

    let late = Value::Duration(calendar::diff_in(&now, &agreed, DurationUnit::Days));
    let penalty_unit = dot(&contract, "penaltyDuration")?;
    let periods = float_div(
        &float_of_nat(&Value::Nat(late.expect_duration()?.amount))?,
        &float_of_nat(&Value::Nat(
            duration_as(&penalty_unit, DurationUnit::Days)?.expect_duration()?.amount,
        ))?,
    )?;
    let goods_value = dot(&request, "goodsValue")?;
    let rate = percent(dot(&contract, "penaltyPercentage")?.expect_float()?);
    let penalty = float_mult(&float_mult(&periods, &rate)?, &goods_value)?;
    let cap = float_mult(&percent(dot(&contract, "capPercentage")?.expect_float()?), &goods_value)?;

    let termination = duration_as(&dot(&contract, "termination")?, DurationUnit::Days)?;
    let may_terminate = compare(&late, &termination).is_gt();

    Ok(left(brand(
        [RESPONSE],
        Value::record([
            ("penalty", float_min(&penalty, &cap)?),
            ("buyerMayTerminate", Value::Bool(may_terminate)),
        ]),
    )?))
}

fn contract() -> Contract {
    Contract::new(vec![clause_from_callback("lateDelivery", [REQUEST], late_delivery)])
}

fn contract_data() -> Value {
    Value::record([
        ("forceMajeure", Value::Bool(false)),
        ("penaltyDuration", Value::Duration(Duration::days(1))),
        ("penaltyPercentage", Value::float(10.0)),
        ("capPercentage", Value::float(55.0)),
        ("termination", Value::Duration(Duration::days(15))),
    ])
}

fn request(type_name: &str, force_majeure: bool) -> Value {
    let agreed = Calendar::utc().parse("2024-03-01").expect("agreed delivery");
    brand(
        [type_name],
        Value::record([
            ("forceMajeure", Value::Bool(force_majeure)),
            ("agreedDelivery", Value::DateTime(agreed)),
            ("goodsValue", Value::float(1000.0)),
        ]),
    )
    .expect("brand request")
}

fn evaluate(request: Value, now: &str) -> Value {
    let now = Calendar::utc().parse(now).expect("now");
    let ctx = context(
        request,
        Value::record([("count", Value::Nat(0))]),
        Value::DateTime(now),
        Value::coll(Vec::new()),
        contract_data(),
    );
    contract().dispatch(&registry(), &ctx).expect("dispatch")
}

#[test]
fn ten_days_late_hits_the_cap() {
    let result = evaluate(request(REQUEST, false), "2024-03-11");
    assert!(either(&result).unwrap());
    let response = covenant::registry::unbrand(&unwrap_response(result).unwrap()).unwrap();
    assert_eq!(dot(&response, "penalty").unwrap(), Value::float(550.0));
    assert_eq!(dot(&response, "buyerMayTerminate").unwrap(), Value::Bool(false));
}

#[test]
fn two_days_late_stays_under_the_cap() {
    let result = evaluate(request(REQUEST, false), "2024-03-03");
    let response = covenant::registry::unbrand(&unwrap_response(result).unwrap()).unwrap();
    assert_eq!(dot(&response, "penalty").unwrap(), Value::float(200.0));
}

#[test]
fn early_exercise_is_a_logic_error() {
    let result = evaluate(request(REQUEST, false), "2024-02-20");
    let error = unwrap_response(result).unwrap_err();
    assert_eq!(
        error.to_string(),
        "Cannot exercise late delivery before delivery date"
    );
}

#[test]
fn unrelated_requests_miss_every_clause() {
    let result = evaluate(request("PaymentRequest", false), "2024-03-11");
    assert!(!either(&result).unwrap());
    let payload = to_right(&result).unwrap();
    let Value::Brand(error) = &payload else {
        panic!("expected branded error, got {payload}");
    };
    assert_eq!(error.type_names(), [dispatch::ERROR_TYPE]);
    assert_eq!(
        dot(error.payload(), "message").unwrap(),
        Value::string(DISPATCH_ERROR_MESSAGE)
    );
}
