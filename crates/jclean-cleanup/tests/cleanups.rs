use jclean_ast::JavaFrontend;
use jclean_cleanup::{CancellationFlag, Engine, EngineError};
use jclean_config::CleanupConfig;
use jclean_core::SourceText;
use jclean_test_utils::FixtureFrontend;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn clean(config: CleanupConfig, source: &str) -> jclean_cleanup::CleanupOutcome {
    Engine::new(config)
        .run(&FixtureFrontend, source, &CancellationFlag::new())
        .unwrap_or_else(|err| panic!("cleanup failed: {err}\n{source}"))
}

const SAMPLE: &str = r#"import java.util.*;

class Sample {
    // counter
    int count = 0;
    List<String> names;
    boolean flag;

    void assign(boolean b) {
        if (b) {
            flag = true;
        } else {
            flag = false;
        }
    }

    void dead() {
        if (false) {
            int i = 0;
        }
        log();
    }

    void nested(boolean a, boolean b) {
        if (a) {
            if (b) {
                log();
            }
        }
    }

    void copy(String[] items) {
        for (String item : items) {
            names.add(item);
        }
    }

    void log() {
    }
}
"#;

const SAMPLE_CLEANED: &str = r#"import java.util.*;

class Sample {
    /** counter */
    int count;
    List<String> names;
    boolean flag;

    void assign(boolean b) {
        flag = b;
    }

    void dead() {
        log();
    }

    void nested(boolean a, boolean b) {
        if (a && b) {
            log();
        }
    }

    void copy(String[] items) {
        Collections.addAll(names, items);
    }

    void log() {
    }
}
"#;

#[test]
fn builtin_rules_clean_a_whole_unit() {
    let outcome = clean(CleanupConfig::default(), SAMPLE);
    assert_eq!(outcome.text, SAMPLE_CLEANED);
    assert!(outcome.reached_fixed_point);
    assert!(!outcome.cancelled);
    for rule in [
        "all_in_one_method",
        "boolean",
        "collapse_if",
        "comments",
        "dead_code",
        "field_default_values",
    ] {
        assert!(outcome.applied.contains_key(rule), "{rule}: {:?}", outcome.applied);
    }

    let again = clean(CleanupConfig::default(), &outcome.text);
    assert_eq!(again.text, outcome.text);
    assert_eq!(again.passes, 1);
    assert!(again.applied.is_empty());
}

#[test]
fn boolean_if_else_collapses_to_the_condition() {
    let source = "class A {\n    boolean x;\n    void m(boolean b) {\n        if (b) {\n            x = false;\n        } else {\n            x = true;\n        }\n    }\n}\n";
    assert_eq!(
        clean(CleanupConfig::default(), source).text,
        "class A {\n    boolean x;\n    void m(boolean b) {\n        x = !b;\n    }\n}\n"
    );
}

#[test]
fn common_tail_of_an_if_chain_is_extracted_once() {
    let source = "class A {\n    boolean a, b;\n    void m() {\n        if (a) {\n            p();\n            q();\n        } else if (b) {\n            r();\n            q();\n        } else {\n            s();\n            q();\n        }\n    }\n}\n";
    assert_eq!(
        clean(CleanupConfig::default(), source).text,
        "class A {\n    boolean a, b;\n    void m() {\n        if (a) {\n            p();\n        } else if (b) {\n            r();\n        } else {\n            s();\n        }\n        q();\n    }\n}\n"
    );
}

#[test]
fn disabled_rules_do_not_run() {
    let config = CleanupConfig {
        disabled_rules: vec!["boolean".to_string(), "comments".to_string()],
        ..CleanupConfig::default()
    };
    let source = "class A {\n    // flag\n    boolean x;\n    void m(boolean b) {\n        if (b) {\n            x = true;\n        } else {\n            x = false;\n        }\n    }\n}\n";
    let outcome = clean(config, source);
    assert_eq!(outcome.text, source);
    assert_eq!(outcome.passes, 1);
}

#[test]
fn cancelled_runs_return_the_input() {
    let cancel = CancellationFlag::new();
    cancel.cancel();
    let outcome = Engine::new(CleanupConfig::default())
        .run(&FixtureFrontend, SAMPLE, &cancel)
        .expect("run");
    assert!(outcome.cancelled);
    assert_eq!(outcome.passes, 0);
    assert_eq!(outcome.text, SAMPLE);
}

#[test]
fn pass_output_refuses_edited_text() {
    let unit = FixtureFrontend.parse(SAMPLE).expect("parse");
    let engine = Engine::new(CleanupConfig::default());
    let output = engine
        .run_pass(&unit, &SourceText::new(SAMPLE))
        .expect("pass");
    assert!(!output.is_empty());

    let edited = SAMPLE.replace("Sample", "Other");
    assert!(matches!(
        output.apply(&edited),
        Err(EngineError::StaleSource { .. })
    ));
    assert!(output.apply(SAMPLE).is_ok());
}

#[test]
fn unparsable_input_is_an_error() {
    let err = Engine::new(CleanupConfig::default())
        .run(&FixtureFrontend, "class {", &CancellationFlag::new())
        .expect_err("syntax error");
    assert!(matches!(err, EngineError::Frontend(_)));
}

const SNIPPETS: &[&str] = &[
    "if (a) {\n            x = 1;\n        } else {\n            x = 1;\n        }\n",
    "if (false) {\n            x = 2;\n        }\n",
    "if (a) {\n            if (b) {\n                x = 3;\n            }\n        }\n",
    "if (a) {\n            b = true;\n        } else {\n            b = false;\n        }\n",
    "x = 4;\n",
    "if (x == x) {\n            x++;\n        }\n",
    "if (b) {\n        } else {\n            f(x);\n        }\n",
    "for (String s : names) {\n            out.add(s);\n        }\n",
];

fn arb_unit() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(SNIPPETS), 0..6).prop_map(|snippets| {
        let body: String = snippets
            .iter()
            .map(|snippet| format!("        {snippet}"))
            .collect();
        format!(
            "import java.util.*;\n\nclass A {{\n    boolean a, b;\n    int x;\n    List<String> names;\n    Set<String> out;\n\n    void m() {{\n{body}    }}\n}}\n"
        )
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn cleanup_reaches_a_stable_parsable_result(source in arb_unit()) {
        let outcome = clean(CleanupConfig::default(), &source);
        prop_assert!(outcome.reached_fixed_point);
        prop_assert!(FixtureFrontend.parse(&outcome.text).is_ok());

        let again = clean(CleanupConfig::default(), &outcome.text);
        prop_assert_eq!(again.passes, 1);
        prop_assert_eq!(again.text, outcome.text);
    }
}
