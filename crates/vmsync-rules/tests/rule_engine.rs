use vmsync_core::{AttributeMap, AttributeValue};
use vmsync_rules::{
    Condition, ConditionKind, ConditionType, Outcome, Rule, RuleEvaluator, RuleSet, Transform,
};

fn vm() -> AttributeMap {
    let mut map = AttributeMap::new();
    map.set("name", "Web01");
    map.set("folder_hierarchy", "Datacenters > DC1 > vm > Finance");
    map.set("guest_os", "Microsoft Windows Server 2019");
    map.set("power_state", "POWERED_ON");
    map.set("cpu_count", 4i64);
    map.set("tags", vec!["prod"]);
    map
}

const DOCUMENT: &str = r#"
[[rule]]
name = "default owner"
sort_field = 1
condition_typ = "anyway"

[[rule.outcomes]]
action = "set"
name = "owner"
value = "unassigned"

[[rule]]
name = "finance owner"
sort_field = 10

[[rule.conditions]]
attribute = "folder_hierarchy"
kind = "ends_with"
value = "finance"

[[rule.outcomes]]
action = "set"
name = "owner"
value = "finance"

[[rule.outcomes]]
action = "set"
name = "label_{{power_state}}"
value = "{{name}}"
transform = { type = "lowercase" }

[[rule]]
name = "disabled"
sort_field = 20
enabled = false
condition_typ = "anyway"

[[rule.outcomes]]
action = "set"
name = "owner"
value = "nobody"
"#;

#[test]
fn test_document_parses_and_last_write_wins() {
    let set = RuleSet::from_toml(DOCUMENT).unwrap();
    assert_eq!(set.rules().len(), 3);
    assert_eq!(set.len(), 2);

    let out = set.apply("Web01", &vm()).unwrap();
    assert_eq!(out.get_text("owner").as_deref(), Some("finance"));
    assert_eq!(out.get_text("label_POWERED_ON").as_deref(), Some("web01"));
    assert_eq!(out.len(), 2);
}

#[test]
fn test_conflicting_keys_follow_sort_order() {
    let a = Rule::new("a")
        .sort_field(1)
        .condition_typ(ConditionType::Anyway)
        .then(Outcome::set("env", "test"));
    let b = Rule::new("b")
        .sort_field(2)
        .condition_typ(ConditionType::Anyway)
        .then(Outcome::set("env", "prod"));

    let forward = RuleSet::new(vec![a.clone(), b.clone()]);
    let reversed = RuleSet::new(vec![b, a]);

    let out_forward = forward.apply("vm", &vm()).unwrap();
    let out_reversed = reversed.apply("vm", &vm()).unwrap();
    assert_eq!(out_forward.get_text("env").as_deref(), Some("prod"));
    assert_eq!(
        serde_json::to_string(&out_forward).unwrap(),
        serde_json::to_string(&out_reversed).unwrap()
    );
}

#[test]
fn test_non_conflicting_rules_are_order_independent() {
    let a = Rule::new("a")
        .condition_typ(ConditionType::Anyway)
        .then(Outcome::copy("guest_os", "os"));
    let b = Rule::new("b")
        .condition_typ(ConditionType::Anyway)
        .then(Outcome::copy("cpu_count", "cpus"));

    let one = RuleSet::new(vec![a.clone(), b.clone()]).apply("vm", &vm()).unwrap();
    let two = RuleSet::new(vec![b, a]).apply("vm", &vm()).unwrap();
    assert_eq!(
        serde_json::to_vec(&one).unwrap(),
        serde_json::to_vec(&two).unwrap()
    );
}

#[test]
fn test_last_match_stops_evaluation() {
    let set = RuleSet::new(vec![
        Rule::new("first")
            .sort_field(1)
            .last_match()
            .when(Condition::new("tags", ConditionKind::Equal, "prod"))
            .then(Outcome::set("tier", "gold")),
        Rule::new("second")
            .sort_field(2)
            .condition_typ(ConditionType::Anyway)
            .then(Outcome::set("tier", "bronze")),
    ]);
    let out = set.apply("vm", &vm()).unwrap();
    assert_eq!(out.get_text("tier").as_deref(), Some("gold"));
}

#[test]
fn test_unmatched_rule_contributes_nothing() {
    let set = RuleSet::new(vec![Rule::new("linux only")
        .when(Condition::new("guest_os", ConditionKind::Contains, "linux"))
        .then(Outcome::set("family", "linux"))]);
    let out = set.apply("vm", &vm()).unwrap();
    assert!(out.is_empty());
}

#[test]
fn test_empty_outputs_are_omitted() {
    let set = RuleSet::new(vec![Rule::new("blank")
        .condition_typ(ConditionType::Anyway)
        .then(Outcome::set("owner", "{{missing}}"))
        .then(Outcome::set("{{missing}}", "value"))
        .then(Outcome::set("spaces", "   "))
        .then(Outcome::copy("missing", "copied"))]);
    let out = set.apply("vm", &vm()).unwrap();
    assert!(out.is_empty());
}

#[test]
fn test_empty_later_output_keeps_earlier_value() {
    let set = RuleSet::new(vec![
        Rule::new("a")
            .sort_field(1)
            .condition_typ(ConditionType::Anyway)
            .then(Outcome::set("owner", "ops")),
        Rule::new("b")
            .sort_field(2)
            .condition_typ(ConditionType::Anyway)
            .then(Outcome::set("owner", "{{missing}}")),
    ]);
    let out = set.apply("vm", &vm()).unwrap();
    assert_eq!(out.get("owner"), Some(&AttributeValue::from("ops")));
}

#[test]
fn test_invalid_pattern_fails_only_objects_that_reach_it() {
    let set = RuleSet::new(vec![Rule::new("broken")
        .when(Condition::new("name", ConditionKind::StartsWith, "db"))
        .when(Condition::new("name", ConditionKind::Regex, "(["))
        .then(Outcome::set("x", "y"))]);

    // The first condition short-circuits for web hosts.
    assert!(set.apply("Web01", &vm()).unwrap().is_empty());

    let mut db = vm();
    db.set("name", "db01");
    let err = set.apply("db01", &db).unwrap_err();
    assert!(err.is_invalid_pattern());
}

#[test]
fn test_regex_condition_and_transform() {
    let set = RuleSet::new(vec![Rule::new("windows")
        .when(Condition::new("guest_os", ConditionKind::Regex, r"windows server \d{4}"))
        .then(
            Outcome::copy("guest_os", "os_year").with_transform(Transform::Regex {
                pattern: r"(\d{4})".into(),
                group: 1,
            }),
        )]);
    let out = set.apply("vm", &vm()).unwrap();
    assert_eq!(out.get_text("os_year").as_deref(), Some("2019"));
}

#[test]
fn test_invalid_document_is_parse_error() {
    let err = RuleSet::from_toml("[[rule]]\nsort_field = \"x\"").unwrap_err();
    assert!(matches!(err, vmsync_rules::RuleError::Parse(_)));
}
