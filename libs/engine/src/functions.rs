//! Builtin function registry
//!
//! Maps function names to arity metadata. Lookup is case-insensitive; keys
//! are stored lowercase in a compile-time perfect hash map so dispatch costs
//! no runtime allocation beyond lowercasing the probe.

use phf::phf_map;

/// Function metadata
#[derive(Debug, Clone, Copy)]
pub struct FunctionMetadata {
    pub name: &'static str,
    pub min_args: usize,
    pub max_args: Option<usize>, // None = unbounded
}

/// Static compile-time function registry using a perfect hash map
static FUNCTIONS_BY_NAME: phf::Map<&'static str, FunctionMetadata> = phf_map! {
    // Math functions
    "abs" => FunctionMetadata { name: "abs", min_args: 1, max_args: Some(1) },
    "max" => FunctionMetadata { name: "max", min_args: 1, max_args: None },
    "min" => FunctionMetadata { name: "min", min_args: 1, max_args: None },
    "round" => FunctionMetadata { name: "round", min_args: 1, max_args: Some(2) },
    "floor" => FunctionMetadata { name: "floor", min_args: 1, max_args: Some(1) },
    "ceil" => FunctionMetadata { name: "ceil", min_args: 1, max_args: Some(1) },
    "pow" => FunctionMetadata { name: "pow", min_args: 2, max_args: Some(2) },
    "sqrt" => FunctionMetadata { name: "sqrt", min_args: 1, max_args: Some(1) },

    // String functions
    "format" => FunctionMetadata { name: "format", min_args: 1, max_args: None },
    "format_currency" => FunctionMetadata { name: "format_currency", min_args: 1, max_args: Some(1) },
    "format_percentage" => FunctionMetadata { name: "format_percentage", min_args: 1, max_args: Some(1) },
    "to_upper" => FunctionMetadata { name: "to_upper", min_args: 1, max_args: Some(1) },
    "to_lower" => FunctionMetadata { name: "to_lower", min_args: 1, max_args: Some(1) },
    "length" => FunctionMetadata { name: "length", min_args: 1, max_args: Some(1) },

    // Date functions
    "dateadd" => FunctionMetadata { name: "dateadd", min_args: 3, max_args: Some(3) },
    "datediff" => FunctionMetadata { name: "datediff", min_args: 3, max_args: Some(3) },
    "time_hour" => FunctionMetadata { name: "time_hour", min_args: 0, max_args: Some(0) },

    // Financial functions
    "calculate_loan_payment" => FunctionMetadata { name: "calculate_loan_payment", min_args: 3, max_args: Some(3) },
    "calculate_compound_interest" => FunctionMetadata { name: "calculate_compound_interest", min_args: 3, max_args: Some(4) },
    "calculate_amortization" => FunctionMetadata { name: "calculate_amortization", min_args: 3, max_args: Some(3) },
    "debt_to_income_ratio" => FunctionMetadata { name: "debt_to_income_ratio", min_args: 2, max_args: Some(2) },
    "credit_utilization" => FunctionMetadata { name: "credit_utilization", min_args: 2, max_args: Some(2) },
    "loan_to_value" => FunctionMetadata { name: "loan_to_value", min_args: 2, max_args: Some(2) },
    "payment_history_score" => FunctionMetadata { name: "payment_history_score", min_args: 2, max_args: Some(2) },

    // Validation functions
    "is_valid_credit_score" => FunctionMetadata { name: "is_valid_credit_score", min_args: 1, max_args: Some(1) },
    "is_valid_ssn" => FunctionMetadata { name: "is_valid_ssn", min_args: 1, max_args: Some(1) },
    "is_valid_account" => FunctionMetadata { name: "is_valid_account", min_args: 1, max_args: Some(1) },
    "is_valid_routing" => FunctionMetadata { name: "is_valid_routing", min_args: 1, max_args: Some(1) },
    "is_valid" => FunctionMetadata { name: "is_valid", min_args: 1, max_args: Some(1) },
    "is_business_day" => FunctionMetadata { name: "is_business_day", min_args: 1, max_args: Some(1) },
    "age_meets_requirement" => FunctionMetadata { name: "age_meets_requirement", min_args: 2, max_args: Some(2) },

    // List functions
    "in_range" => FunctionMetadata { name: "in_range", min_args: 3, max_args: Some(3) },
    "distance_between" => FunctionMetadata { name: "distance_between", min_args: 2, max_args: Some(2) },

    // Logging functions
    "log" => FunctionMetadata { name: "log", min_args: 0, max_args: None },
    "print" => FunctionMetadata { name: "print", min_args: 0, max_args: None },
    "notify" => FunctionMetadata { name: "notify", min_args: 0, max_args: None },
    "alert" => FunctionMetadata { name: "alert", min_args: 0, max_args: None },
    "audit_log" => FunctionMetadata { name: "audit_log", min_args: 0, max_args: None },
    "send_notification" => FunctionMetadata { name: "send_notification", min_args: 0, max_args: None },

    // JSON functions
    "json_get" => FunctionMetadata { name: "json_get", min_args: 2, max_args: Some(2) },
    "json_path" => FunctionMetadata { name: "json_path", min_args: 2, max_args: Some(2) },
    "json_exists" => FunctionMetadata { name: "json_exists", min_args: 2, max_args: Some(2) },
    "json_size" => FunctionMetadata { name: "json_size", min_args: 2, max_args: Some(2) },
    "json_type" => FunctionMetadata { name: "json_type", min_args: 2, max_args: Some(2) },

    // REST functions
    "rest_get" => FunctionMetadata { name: "rest_get", min_args: 1, max_args: Some(3) },
    "rest_post" => FunctionMetadata { name: "rest_post", min_args: 1, max_args: Some(4) },
    "rest_put" => FunctionMetadata { name: "rest_put", min_args: 1, max_args: Some(4) },
    "rest_patch" => FunctionMetadata { name: "rest_patch", min_args: 1, max_args: Some(4) },
    "rest_delete" => FunctionMetadata { name: "rest_delete", min_args: 1, max_args: Some(3) },
    "rest_call" => FunctionMetadata { name: "rest_call", min_args: 2, max_args: Some(5) },
};

/// Case-insensitive registry lookup.
pub fn lookup(name: &str) -> Option<&'static FunctionMetadata> {
    FUNCTIONS_BY_NAME.get(name.to_lowercase().as_str())
}

/// Check an argument count against a function's declared arity.
pub fn arity_ok(metadata: &FunctionMetadata, arg_count: usize) -> bool {
    arg_count >= metadata.min_args
        && metadata.max_args.map(|max| arg_count <= max).unwrap_or(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert!(lookup("max").is_some());
        assert!(lookup("MAX").is_some());
        assert!(lookup("Format_Currency").is_some());
        assert!(lookup("no_such_function").is_none());
    }

    #[test]
    fn test_arity() {
        let max = lookup("max").unwrap();
        assert!(arity_ok(max, 1));
        assert!(arity_ok(max, 9));
        assert!(!arity_ok(max, 0));

        let pow = lookup("pow").unwrap();
        assert!(arity_ok(pow, 2));
        assert!(!arity_ok(pow, 3));
    }
}
