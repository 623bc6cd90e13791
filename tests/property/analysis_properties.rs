use proptest::prelude::*;

use excheck::check_source;
use excheck::lexer::is_keyword;

fn fn_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,8}".prop_filter("not a keyword", |s| !is_keyword(s))
}

fn class_name() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[A-Z][A-Za-z0-9]{0,8}").unwrap()
}

proptest! {
    #[test]
    fn never_panics_on_arbitrary_input(src in "\\PC{0,200}") {
        let _ = check_source(&src);
    }

    #[test]
    fn never_panics_on_token_soup(
        tokens in prop::collection::vec(
            prop_oneof![
                Just("fn".to_string()),
                Just("try".to_string()),
                Just("catch".to_string()),
                Just("finally".to_string()),
                Just("throw".to_string()),
                Just("throws".to_string()),
                Just("{".to_string()),
                Just("}".to_string()),
                Just("(".to_string()),
                Just(")".to_string()),
                Just("@".to_string()),
                Just("::".to_string()),
                fn_name(),
            ],
            0..40,
        )
    ) {
        let src = tokens.join(" ");
        let _ = check_source(&src);
    }

    #[test]
    fn escaping_call_is_always_reported(exc in class_name(), func in fn_name()) {
        let src = format!(
            "class {exc} {{\n}}\nextern fn {func}() throws {exc}\nfn main() {{\n    {func}()\n}}\n"
        );
        let findings = check_source(&src).unwrap();
        prop_assert_eq!(findings.len(), 1);
        prop_assert_eq!(&findings[0].unhandled, &[exc.clone()]);
        prop_assert!(!findings[0].unhandled.is_empty());
        prop_assert!(findings[0].site.end <= src.len());
        prop_assert!(findings[0].site.start < findings[0].site.end);
    }

    #[test]
    fn caught_call_is_never_reported(exc in class_name(), func in fn_name()) {
        let src = format!(
            "class {exc} {{\n}}\nextern fn {func}() throws {exc}\nfn main() {{\n    try {{\n        {func}()\n    }} catch (e: {exc}) {{\n    }}\n}}\n"
        );
        prop_assert!(check_source(&src).unwrap().is_empty());
    }

    #[test]
    fn declared_call_is_never_reported(exc in class_name(), func in fn_name()) {
        let src = format!(
            "class {exc} {{\n}}\nextern fn {func}() throws {exc}\n@Throws({exc}::class)\nfn main() {{\n    {func}()\n}}\n"
        );
        prop_assert!(check_source(&src).unwrap().is_empty());
    }

    #[test]
    fn covered_throw_is_never_reported(exc in class_name()) {
        let src = format!(
            "class {exc} {{\n}}\nfn main() {{\n    try {{\n        throw {exc}()\n    }} catch (e: {exc}) {{\n    }}\n}}\n"
        );
        prop_assert!(check_source(&src).unwrap().is_empty());
    }

    #[test]
    fn finding_count_matches_site_count(exc in class_name(), func in fn_name(), sites in 1usize..5) {
        let calls: String = (0..sites).map(|_| format!("    {func}()\n")).collect();
        let src = format!(
            "class {exc} {{\n}}\nextern fn {func}() throws {exc}\nfn main() {{\n{calls}}}\n"
        );
        let findings = check_source(&src).unwrap();
        prop_assert_eq!(findings.len(), sites);
    }
}
