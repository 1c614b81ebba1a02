use assert_matches::assert_matches;
use xscan_rules::{compile, CompilationStage, Compiler};

fn matched(source: &str, data: &[u8]) -> Vec<String> {
    compile(source)
        .unwrap()
        .scan(data)
        .into_iter()
        .map(|m| m.rule)
        .collect()
}

#[test]
fn test_tags_and_meta_are_reported() {
    let rules = compile(
        r#"
        rule miner : malware crypto {
            meta:
                author = "ops"
                severity = 3
            strings:
                $pool = "stratum+tcp://" nocase
            condition:
                $pool
        }
        "#,
    )
    .unwrap();

    let matches = rules.scan(b"connect('STRATUM+TCP://pool.example:3333')");

    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].rule, "miner");
    assert!(matches[0].tags.contains("malware"));
    assert!(matches[0].tags.contains("crypto"));
    assert_eq!(matches[0].meta.get("author").map(String::as_str), Some("ops"));
    assert_eq!(matches[0].meta.get("severity").map(String::as_str), Some("3"));
}

#[test]
fn test_private_rule_feeds_others_but_is_hidden() {
    let source = r#"
        private rule has_eval {
            strings: $e = "eval("
            condition: $e
        }
        rule obfuscated {
            strings: $b = "atob("
            condition: has_eval and $b
        }
    "#;

    assert_eq!(matched(source, b"eval(atob('Zm9v'))"), vec!["obfuscated"]);
    assert!(matched(source, b"eval(x)").is_empty());
}

#[test]
fn test_failed_global_rule_suppresses_all_matches() {
    let source = r#"
        global rule small_files { condition: filesize < 1KB }
        rule anything { condition: true }
    "#;

    assert_eq!(matched(source, b"tiny"), vec!["small_files", "anything"]);
    assert!(matched(source, &vec![b'a'; 2048]).is_empty());
}

#[test]
fn test_quantifiers_over_wildcard_sets() {
    let source = r#"
        rule two_apis {
            strings:
                $api_tabs = "chrome.tabs"
                $api_cookies = "chrome.cookies"
                $api_history = "chrome.history"
                $other = "window.open"
            condition:
                2 of ($api*) and not $other
        }
        rule all_present {
            strings:
                $x = "alpha"
                $y = "beta"
            condition:
                all of them
        }
        rule none_present {
            strings:
                $z = "gamma"
            condition:
                none of them
        }
    "#;

    assert_eq!(
        matched(source, b"chrome.tabs; chrome.cookies; alpha beta"),
        vec!["two_apis", "all_present", "none_present"]
    );
    assert_eq!(
        matched(source, b"chrome.tabs; chrome.cookies; window.open; gamma"),
        Vec::<String>::new()
    );
}

#[test]
fn test_counts_and_hex_patterns() {
    let source = r#"
        rule repeated {
            strings: $k = "key"
            condition: #k >= 3
        }
        rule zip_header {
            strings: $h = { 50 4B 03 04 [2-4] ?? 00 }
            condition: $h
        }
        rule regex_url {
            strings: $u = /https?:\/\/[a-z]+\.example/ nocase
            condition: $u
        }
    "#;

    let data = b"key key key PK\x03\x04\x14\x00\x08\x00\x00 HTTPS://cdn.EXAMPLE";
    assert_eq!(
        matched(source, data),
        vec!["repeated", "zip_header", "regex_url"]
    );
}

#[test]
fn test_counts_include_overlapping_occurrences() {
    let source = r#"
        rule three_pairs {
            strings: $a = "aa"
            condition: #a == 3
        }
    "#;

    assert_eq!(matched(source, b"aaaa"), vec!["three_pairs"]);
    assert!(matched(source, b"aa aa").is_empty());
}

#[test]
fn test_wide_fullword_strings() {
    let source = r#"
        rule wide_word {
            strings: $w = "token" wide fullword
            condition: $w
        }
    "#;

    assert_eq!(matched(source, b"t\x00o\x00k\x00e\x00n\x00 \x00"), vec!["wide_word"]);
    assert!(matched(source, b"x\x00t\x00o\x00k\x00e\x00n\x00").is_empty());
}

#[test]
fn test_errors_report_stage_and_position() {
    let lexical = compile("rule a { condition: @ }").unwrap_err();
    assert_eq!(lexical.stage, CompilationStage::Lexical);

    let syntax = compile("rule a { condition: }").unwrap_err();
    assert_eq!(syntax.stage, CompilationStage::Syntax);

    let validation = compile("rule a {\n  condition:\n    $missing\n}").unwrap_err();
    assert_eq!(validation.stage, CompilationStage::Validation);
    assert_eq!(validation.line, 3);
}

#[test]
fn test_compiler_keeps_accepted_sources_after_rejection() {
    let mut compiler = Compiler::new();
    compiler
        .add_source(r#"rule first { strings: $a = "one" condition: $a }"#)
        .unwrap();
    assert_matches!(
        compiler.add_source("rule first { condition: true }"),
        Err(e) if e.stage == CompilationStage::Validation
    );
    compiler
        .add_source("rule second { condition: first }")
        .unwrap();

    assert_eq!(compiler.stats().sources_accepted, 2);
    assert_eq!(compiler.stats().sources_rejected, 1);

    let rules = compiler.build();
    let names: Vec<_> = rules.scan(b"one").into_iter().map(|m| m.rule).collect();
    assert_eq!(names, vec!["first", "second"]);
}
