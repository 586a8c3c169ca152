// Property tests for the $unwind stage
use aggregation_core::{RootContext, UnwindOperation};
use proptest::prelude::*;

// Field names as they appear in documents: letters, digits, underscores and dotted paths
fn field_name() -> impl Strategy<Value = String> {
    "[a-zA-Z_][a-zA-Z0-9_]{0,12}(\\.[a-zA-Z_][a-zA-Z0-9_]{0,8}){0,2}"
}

proptest! {
    #[test]
    fn prop_path_is_dollar_prefixed_name(name in field_name(), preserve in any::<bool>()) {
        let op = UnwindOperation::with_preserve(name.as_str(), preserve).unwrap();
        let spec = op.spec(&RootContext);

        prop_assert_eq!(spec.path, format!("${}", name));
        prop_assert_eq!(spec.preserve_null_and_empty_arrays, preserve);
        prop_assert!(spec.include_array_index.is_none());
    }

    #[test]
    fn prop_index_field_kept_verbatim(name in field_name(), index in field_name()) {
        let op = UnwindOperation::with_index(name.as_str(), index.as_str(), false).unwrap();
        let spec = op.spec(&RootContext);

        prop_assert_eq!(spec.include_array_index, Some(index));
    }

    #[test]
    fn prop_render_is_repeatable(name in field_name(), index in field_name(), preserve in any::<bool>()) {
        let op = UnwindOperation::with_index(name.as_str(), index.as_str(), preserve).unwrap();
        prop_assert_eq!(op.render(&RootContext), op.render(&RootContext));
    }

    #[test]
    fn prop_blank_names_rejected(blank in "[ \\t]{0,4}\\$?[ \\t]{0,4}") {
        prop_assert!(UnwindOperation::new(blank.as_str()).is_err());
    }
}
