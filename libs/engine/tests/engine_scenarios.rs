//! End-to-end evaluation scenarios

use std::collections::BTreeMap;
use std::sync::Arc;
use verdict_engine::providers::{InMemoryConstantProvider, StaticRestProvider};
use verdict_engine::{Engine, EngineConfig, ErrorCode, Value};

fn inputs(json: serde_json::Value) -> BTreeMap<String, Value> {
    match Value::from_json(json) {
        Value::Object(map) => map,
        other => panic!("inputs must be an object, got {:?}", other),
    }
}

fn num(n: &str) -> Value {
    Value::Number(n.parse().unwrap())
}

#[tokio::test]
async fn approval_with_provider_constant() {
    let config = EngineConfig::default().with_constant_provider(Arc::new(
        InMemoryConstantProvider::default().with("MIN_CREDIT_SCORE", 650i64),
    ));
    let engine = Engine::new(config);

    let yaml = r#"
name: loan-approval
inputs:
  - creditScore
  - annualIncome
when: creditScore at_least MIN_CREDIT_SCORE and annualIncome greater_than 50000
then:
  - set approval_status to "APPROVED"
else:
  - set approval_status to "DECLINED"
output:
  approval_status: text
"#;

    let result = engine
        .evaluate(yaml, &inputs(serde_json::json!({"creditScore": 750, "annualIncome": 60000})))
        .await;

    assert!(result.success);
    assert!(result.condition_met);
    assert_eq!(result.output_data["approval_status"], Value::text("APPROVED"));

    // Below the threshold the else branch runs and the condition is not met.
    let result = engine
        .evaluate(yaml, &inputs(serde_json::json!({"creditScore": 600, "annualIncome": 60000})))
        .await;
    assert!(result.success);
    assert!(!result.condition_met);
    assert_eq!(result.output_data["approval_status"], Value::text("DECLINED"));
}

#[tokio::test]
async fn division_by_zero_is_safe() {
    let engine = Engine::default();
    let yaml = r#"
name: division-safety
inputs:
  - a
  - b
when: true
then:
  - calculate result as a / b
output:
  result: number
"#;

    let result = engine
        .evaluate(yaml, &inputs(serde_json::json!({"a": 10, "b": 0})))
        .await;

    assert!(result.success);
    assert_eq!(result.output_data.get("result"), Some(&Value::Null));
    assert!(result
        .warnings
        .iter()
        .any(|w| w.code == ErrorCode::DivisionByZero));
}

#[tokio::test]
async fn division_by_zero_preserves_prior_value() {
    let engine = Engine::default();
    let yaml = r#"
name: division-preserves
inputs:
  - a
  - b
when: true
then:
  - set result to 42
  - calculate result as a / b
output:
  result: number
"#;

    let result = engine
        .evaluate(yaml, &inputs(serde_json::json!({"a": 10, "b": 0})))
        .await;

    assert!(result.success);
    assert_eq!(result.output_data["result"], num("42"));
}

#[tokio::test]
async fn circuit_breaker_halts_following_actions() {
    let engine = Engine::default();
    let yaml = r#"
name: breaker
inputs:
  - riskScore
when: true
then:
  - set initial_check to "PASSED"
  - if riskScore greater_than 90 then circuit_breaker "HIGH_RISK"
  - set final_check to "COMPLETED"
output:
  initial_check: text
  final_check: text
"#;

    let result = engine
        .evaluate(yaml, &inputs(serde_json::json!({"riskScore": 95})))
        .await;

    assert!(result.success);
    assert!(result.circuit_breaker_triggered);
    assert_eq!(result.circuit_breaker_message.as_deref(), Some("HIGH_RISK"));
    assert_eq!(result.output_data["initial_check"], Value::text("PASSED"));
    assert!(!result.output_data.contains_key("final_check"));

    // Below the threshold everything runs.
    let result = engine
        .evaluate(yaml, &inputs(serde_json::json!({"riskScore": 10})))
        .await;
    assert!(!result.circuit_breaker_triggered);
    assert_eq!(result.output_data["final_check"], Value::text("COMPLETED"));
}

#[tokio::test]
async fn circuit_breaker_halts_following_sub_rules() {
    let engine = Engine::default();
    let yaml = r#"
name: breaker-multi
inputs:
  - riskScore
rules:
  - name: gate
    when: riskScore greater_than 90
    then:
      - set gate_state to "TRIPPED"
      - circuit_breaker "HIGH_RISK"
  - name: downstream
    then:
      - set downstream_state to "RAN"
output:
  gate_state: text
  downstream_state: text
"#;

    let result = engine
        .evaluate(yaml, &inputs(serde_json::json!({"riskScore": 99})))
        .await;

    assert!(result.success);
    assert!(result.circuit_breaker_triggered);
    assert_eq!(result.output_data["gate_state"], Value::text("TRIPPED"));
    assert!(!result.output_data.contains_key("downstream_state"));
}

#[tokio::test]
async fn sub_rules_share_computed_state() {
    let engine = Engine::default();
    let yaml = r#"
name: dti
inputs:
  - monthlyDebt
  - annualIncome
rules:
  - name: compute-dti
    then:
      - calculate dti as monthlyDebt / (annualIncome / 12)
  - name: flag-high-risk
    when: dti greater_than 0.4
    then:
      - set risk_level to "HIGH"
output:
  dti: number
  risk_level: text
"#;

    let result = engine
        .evaluate(yaml, &inputs(serde_json::json!({"monthlyDebt": 3000, "annualIncome": 60000})))
        .await;

    assert!(result.success);
    assert!(result.condition_met);
    assert_eq!(result.output_data["dti"], num("0.6"));
    assert_eq!(result.output_data["risk_level"], Value::text("HIGH"));
}

#[tokio::test]
async fn inline_default_fills_missing_constant() {
    let engine = Engine::default(); // provider knows nothing
    let yaml = r#"
name: defaulted
inputs:
  - creditScore
constants:
  - code: MIN_CREDIT_SCORE
    defaultValue: 650
when: creditScore at_least MIN_CREDIT_SCORE
then:
  - set decision to "PASS"
output:
  decision: text
"#;

    let result = engine
        .evaluate(yaml, &inputs(serde_json::json!({"creditScore": 680})))
        .await;

    assert!(result.success);
    assert!(result.condition_met);
    assert_eq!(result.output_data["decision"], Value::text("PASS"));
}

#[tokio::test]
async fn missing_constant_without_default_short_circuits() {
    let engine = Engine::default();
    let yaml = r#"
name: missing-constant
inputs:
  - creditScore
when: creditScore at_least MIN_CREDIT_SCORE
then:
  - set decision to "PASS"
"#;

    let result = engine
        .evaluate(yaml, &inputs(serde_json::json!({"creditScore": 680})))
        .await;

    assert!(!result.success);
    let error = result.error.unwrap();
    assert!(error.contains("Required constants not found in database"));
    assert!(error.contains("MIN_CREDIT_SCORE"));
    assert!(result.output_data.is_empty());
}

#[tokio::test]
async fn for_each_accumulates() {
    let engine = Engine::default();
    let yaml = r#"
name: sum
inputs:
  - numbers
when: true
then:
  - set total to 0
  - "forEach n in numbers: calculate total as total + n"
output:
  total: number
"#;

    let result = engine
        .evaluate(yaml, &inputs(serde_json::json!({"numbers": [10, 20, 30, 40, 50]})))
        .await;

    assert!(result.success);
    assert_eq!(result.output_data["total"], num("150"));

    // Boundary behaviors: empty list runs the body zero times, a scalar is
    // one iteration.
    let result = engine
        .evaluate(yaml, &inputs(serde_json::json!({"numbers": []})))
        .await;
    assert_eq!(result.output_data["total"], num("0"));

    let result = engine
        .evaluate(yaml, &inputs(serde_json::json!({"numbers": 7})))
        .await;
    assert_eq!(result.output_data["total"], num("7"));
}

#[tokio::test]
async fn for_each_bindings_persist_after_loop() {
    let engine = Engine::default();
    let yaml = r#"
name: bindings
inputs:
  - items
when: true
then:
  - "forEach item, idx in items: set seen to item"
output:
  item: text
  idx: number
  seen: text
"#;

    let result = engine
        .evaluate(yaml, &inputs(serde_json::json!({"items": ["a", "b", "c"]})))
        .await;

    assert_eq!(result.output_data["item"], Value::text("c"));
    assert_eq!(result.output_data["idx"], num("2"));
    assert_eq!(result.output_data["seen"], Value::text("c"));
}

#[tokio::test]
async fn empty_rule_projects_inputs() {
    let engine = Engine::default();
    let yaml = r#"
name: projection
inputs:
  - creditScore
when: true
then: []
output:
  creditScore: number
"#;

    let result = engine
        .evaluate(yaml, &inputs(serde_json::json!({"creditScore": 750})))
        .await;

    assert!(result.success);
    assert!(result.condition_met);
    assert_eq!(result.output_data["creditScore"], num("750"));
}

#[tokio::test]
async fn bare_equals_in_when_line() {
    let engine = Engine::default();
    let yaml = r#"
name: equals-synonym
inputs:
  - accountTier
when: accountTier = "GOLD"
then:
  - set fee_waived to true
else:
  - set fee_waived to false
output:
  fee_waived: boolean
"#;

    let result = engine
        .evaluate(yaml, &inputs(serde_json::json!({"accountTier": "GOLD"})))
        .await;
    assert!(result.success);
    assert!(result.condition_met);
    assert_eq!(result.output_data["fee_waived"], Value::Bool(true));

    let result = engine
        .evaluate(yaml, &inputs(serde_json::json!({"accountTier": "SILVER"})))
        .await;
    assert!(!result.condition_met);
    assert_eq!(result.output_data["fee_waived"], Value::Bool(false));
}

#[tokio::test]
async fn missing_input_comparisons_are_false() {
    let engine = Engine::default();
    let yaml = r#"
name: null-compare
when: missingValue greater_than 10
then:
  - set hit to true
else:
  - set hit to false
output:
  hit: boolean
"#;

    let result = engine.evaluate(yaml, &BTreeMap::new()).await;
    assert!(!result.condition_met);
    assert_eq!(result.output_data["hit"], Value::Bool(false));

    let yaml = r#"
name: null-check
when: missingValue is_null
then:
  - set hit to true
output:
  hit: boolean
"#;
    let result = engine.evaluate(yaml, &BTreeMap::new()).await;
    assert!(result.condition_met);
    assert_eq!(result.output_data["hit"], Value::Bool(true));
}

#[tokio::test]
async fn rest_and_json_path_round_trip() {
    let config = EngineConfig::default().with_rest_provider(Arc::new(
        StaticRestProvider::default().with(
            "get",
            "http://bureau/score",
            Value::from_json(serde_json::json!({"score": 712, "history": [1, 2, 3]})),
        ),
    ));
    let engine = Engine::new(config);

    let yaml = r#"
name: bureau
when: true
then:
  - run response as rest_get("http://bureau/score")
  - run bureau_score as json_get(response, "body.score")
  - run history_size as json_size(response, "body.history")
output:
  bureau_score: number
  history_size: number
"#;

    let result = engine.evaluate(yaml, &BTreeMap::new()).await;
    assert!(result.success);
    assert_eq!(result.output_data["bureau_score"], num("712"));
    assert_eq!(result.output_data["history_size"], num("3"));
}

#[tokio::test]
async fn rest_failure_is_a_result_map_not_an_error() {
    let engine = Engine::default(); // NoRestProvider fails every call
    let yaml = r#"
name: rest-failure
when: true
then:
  - run response as rest_get("http://nowhere/x")
  - run ok as json_get(response, "success")
output:
  ok: boolean
"#;

    let result = engine.evaluate(yaml, &BTreeMap::new()).await;
    assert!(result.success);
    assert_eq!(result.output_data["ok"], Value::Bool(false));
    assert!(result
        .warnings
        .iter()
        .any(|w| w.code == ErrorCode::RestFailure));
}

#[tokio::test]
async fn unknown_function_recovers_with_null() {
    let engine = Engine::default();
    let yaml = r#"
name: unknown-function
when: true
then:
  - run mystery as frobnicate(1, 2)
output:
  mystery: text
"#;

    let result = engine.evaluate(yaml, &BTreeMap::new()).await;
    assert!(result.success);
    assert_eq!(result.output_data.get("mystery"), Some(&Value::Null));
    let warning = result
        .warnings
        .iter()
        .find(|w| w.code == ErrorCode::FunctionUnknown)
        .expect("expected a FUNCTION_UNKNOWN warning");
    assert!(warning.message.contains("frobnicate(1, 2)"));
}

#[tokio::test]
async fn type_mismatch_skips_action_and_continues() {
    let engine = Engine::default();
    let yaml = r#"
name: mismatch
inputs:
  - label
when: true
then:
  - set counter to "not a number"
  - add 5 to counter
  - set after to "REACHED"
output:
  counter: text
  after: text
"#;

    let result = engine
        .evaluate(yaml, &inputs(serde_json::json!({"label": "x"})))
        .await;

    assert!(result.success);
    assert_eq!(result.output_data["counter"], Value::text("not a number"));
    assert_eq!(result.output_data["after"], Value::text("REACHED"));
    assert!(result
        .warnings
        .iter()
        .any(|w| w.code == ErrorCode::TypeMismatch));
}

#[tokio::test]
async fn list_actions_build_and_mutate() {
    let engine = Engine::default();
    let yaml = r#"
name: lists
when: true
then:
  - append "B" to flags
  - append "C" to flags
  - prepend "A" to flags
  - remove "B" from flags
output:
  flags: list
"#;

    let result = engine.evaluate(yaml, &BTreeMap::new()).await;
    assert_eq!(
        result.output_data["flags"],
        Value::List(vec![Value::text("A"), Value::text("C")])
    );
}

#[tokio::test]
async fn compound_assignment_and_natural_arithmetic() {
    let engine = Engine::default();
    let yaml = r#"
name: assignments
inputs:
  - base
when: true
then:
  - set score to base
  - score += 10
  - score *= 2
  - subtract 20 from score
  - divide score by 4
output:
  score: number
"#;

    let result = engine
        .evaluate(yaml, &inputs(serde_json::json!({"base": 50})))
        .await;

    // ((50 + 10) * 2 - 20) / 4
    assert_eq!(result.output_data["score"], num("25"));
}

#[tokio::test]
async fn financial_pipeline() {
    let engine = Engine::default();
    let yaml = r#"
name: affordability
inputs:
  - principal
  - rate
  - years
  - monthlyDebt
  - monthlyIncome
when: true
then:
  - call calculate_loan_payment with principal, rate, years into payment
  - run dti as debt_to_income_ratio(monthlyDebt + payment, monthlyIncome)
  - if dti at_most 0.43 then set verdict to "AFFORDABLE" else set verdict to "STRETCHED"
output:
  payment: number
  dti: number
  verdict: text
"#;

    let result = engine
        .evaluate(
            yaml,
            &inputs(serde_json::json!({
                "principal": 200000,
                "rate": 6,
                "years": 30,
                "monthlyDebt": 500,
                "monthlyIncome": 6000,
            })),
        )
        .await;

    assert!(result.success);
    assert_eq!(result.output_data["payment"], num("1199.10"));
    assert_eq!(result.output_data["verdict"], Value::text("AFFORDABLE"));
}

#[tokio::test]
async fn naming_violations_warn_but_do_not_fail() {
    let engine = Engine::default();
    let yaml = r#"
name: naming
inputs:
  - CreditScore
when: true
then:
  - set Decision to "OK"
output:
  Decision: text
"#;

    let result = engine
        .evaluate(yaml, &inputs(serde_json::json!({"CreditScore": 700})))
        .await;

    assert!(result.success);
    assert_eq!(result.output_data["Decision"], Value::text("OK"));
    assert_eq!(
        result
            .warnings
            .iter()
            .filter(|w| w.code == ErrorCode::NamingConvention)
            .count(),
        2
    );
}

#[test]
fn blocking_entry_point() {
    let engine = Engine::default();
    let yaml = "name: blocking\nwhen: true\nthen:\n  - set ok to true\noutput:\n  ok: boolean\n";
    let result = engine.evaluate_blocking(yaml, &BTreeMap::new());
    assert!(result.success);
    assert_eq!(result.output_data["ok"], Value::Bool(true));
    assert!(!result.operation_id.is_empty());
}
