//! Tests for rule spec parsing.

use formkit_model::RuleArg;
use formkit_rules::{
    ANONYMOUS_RULE, Predicate, RuleEntry, RuleError, RuleLibrary, RuleSpec, parse,
};
use serde_json::json;

fn names(spec: &RuleSpec) -> Vec<String> {
    parse(spec, &RuleLibrary::builtin())
        .unwrap()
        .into_iter()
        .map(|rule| rule.name)
        .collect()
}

#[test]
fn pipe_string_keeps_declaration_order() {
    assert_eq!(
        names(&RuleSpec::from("required|between:3,10|email")),
        ["required", "between", "email"]
    );
}

#[test]
fn colon_args_stay_strings() {
    let rules = parse(&RuleSpec::from("between:3,10"), &RuleLibrary::builtin()).unwrap();
    assert_eq!(rules[0].args, vec![RuleArg::from("3"), RuleArg::from("10")]);
}

#[test]
fn snake_and_kebab_names_resolve() {
    assert_eq!(
        names(&RuleSpec::from("starts_with:a|ends-with:b")),
        ["startsWith", "endsWith"]
    );
}

#[test]
fn unknown_rule_aborts_whole_parse() {
    let err = parse(&RuleSpec::from("required|nonsense:1|email"), &RuleLibrary::builtin())
        .unwrap_err();
    assert_eq!(
        err,
        RuleError::UnknownRule {
            token: "nonsense".to_string()
        }
    );
}

#[test]
fn nameless_token_is_malformed() {
    let err = parse(&RuleSpec::from("required|:3"), &RuleLibrary::builtin()).unwrap_err();
    assert!(matches!(err, RuleError::MalformedRule { .. }));
}

#[test]
fn empty_spec_parses_to_nothing() {
    assert!(names(&RuleSpec::from("")).is_empty());
    assert!(names(&RuleSpec::none()).is_empty());
}

#[test]
fn mixed_list_form() {
    let custom = Predicate::from_fn(|_, _| true);
    let spec = RuleSpec::List(vec![
        RuleEntry::from("required"),
        RuleEntry::tuple("min", [json!(3), json!("length")]),
        RuleEntry::callable(custom.clone()),
        RuleEntry::named("checksum", custom),
    ]);
    let rules = parse(&spec, &RuleLibrary::builtin()).unwrap();
    let names: Vec<_> = rules.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["required", "min", ANONYMOUS_RULE, "checksum"]);
    assert_eq!(rules[1].args[0], RuleArg::Value(json!(3)));
    assert!(rules[2].args.is_empty());
}

#[test]
fn tuple_with_regex_argument() {
    let pattern = regex::Regex::new(r"^\d+$").unwrap();
    let spec = RuleSpec::List(vec![RuleEntry::tuple("matches", [pattern])]);
    let rules = parse(&spec, &RuleLibrary::builtin()).unwrap();
    assert!(matches!(rules[0].args[0], RuleArg::Pattern(_)));
}

#[test]
fn bail_modifier_and_pseudo_rule() {
    let rules = parse(
        &RuleSpec::from("^required|min:3|bail|email|url"),
        &RuleLibrary::builtin(),
    )
    .unwrap();
    let flags: Vec<_> = rules.iter().map(|r| (r.name.as_str(), r.bail)).collect();
    assert_eq!(
        flags,
        [
            ("required", true),
            ("min", false),
            ("email", true),
            ("url", true)
        ]
    );
}

#[test]
fn host_override_is_used_by_parser() {
    let always = Predicate::from_fn(|_, _| true);
    let library = RuleLibrary::builtin().with_rule("required", always.clone());
    let rules = parse(&RuleSpec::from("required"), &library).unwrap();
    assert!(rules[0].predicate.ptr_eq(&always));
}

#[test]
fn deserialized_spec_parses() {
    let spec: RuleSpec = serde_json::from_value(json!(["required", ["in", "a", "b"]])).unwrap();
    let rules = parse(&spec, &RuleLibrary::builtin()).unwrap();
    assert_eq!(rules[1].args, vec![RuleArg::Value(json!("a")), RuleArg::Value(json!("b"))]);
}
