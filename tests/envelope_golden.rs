use bugbridge::core::{Finding, ResponseEnvelope, RunStats};
use bugbridge::errors::ErrorCode;

fn greeter_finding() -> Finding {
    let mut f = Finding::new("NP_NULL_ON_SOME_PATH", 6)
        .with_source("com/acme/Greeter.java")
        .with_lines(14, 16);
    f.category = "CORRECTNESS".to_string();
    f.message =
        "Possible null pointer dereference of name in com.acme.Greeter.greet(String)".to_string();
    f.class_name = Some("com.acme.Greeter".to_string());
    f.full_path = Some("/work/app/src/main/java/com/acme/Greeter.java".to_string());
    f.external_url = Some(
        "https://spotbugs.readthedocs.io/en/latest/bugDescriptions.html#np-possible-null-pointer-dereference-np-null-on-some-path"
            .to_string(),
    );
    f
}

#[test]
fn success_envelope_matches_golden() {
    let mut exit = Finding::new("DM_EXIT", 16).with_source("com/acme/Main.java");
    exit.category = "BAD_PRACTICE".to_string();
    exit.message = "com.acme.Main.main(String[]) invokes System.exit(...)".to_string();

    let envelope = ResponseEnvelope::success(
        vec![greeter_finding(), exit],
        RunStats {
            target: "/work/app/src/main/java".to_string(),
            target_count: 2,
            duration_ms: 1532,
            finding_count: 2,
            classpath_count: 1,
            plugin_count: 0,
            engine_version: "4.8.6".to_string(),
        },
    );

    let actual = serde_json::to_value(&envelope).expect("serialize envelope");
    let expected: serde_json::Value =
        serde_json::from_str(include_str!("golden/envelope.json")).expect("parse golden json");

    assert_eq!(actual, expected);
}

#[test]
fn golden_envelope_deserializes_back() {
    let envelope: ResponseEnvelope =
        serde_json::from_str(include_str!("golden/envelope.json")).expect("parse golden json");
    assert!(envelope.is_success());
    assert_eq!(envelope.results[0], greeter_finding());
    assert_eq!(envelope.results[1].class_name, None);
}

#[test]
fn error_envelope_shape() {
    let envelope = ResponseEnvelope::error(
        ErrorCode::InvalidArgument,
        "Argument 'path' must not be empty",
    );
    let actual = serde_json::to_value(&envelope).expect("serialize envelope");
    let expected = serde_json::json!({
        "schemaVersion": 1,
        "results": [],
        "errors": [
            {"code": "INVALID_ARGUMENT", "message": "Argument 'path' must not be empty"}
        ]
    });
    assert_eq!(actual, expected);
}
