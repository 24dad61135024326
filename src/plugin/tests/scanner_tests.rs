//! Export scanner test suite

use super::mock_exports::*;
use crate::plugin::error::PluginError;
use crate::plugin::exports::ContractKey;
use crate::plugin::scanner::{resolve_contract, ExportScanner};

#[test]
fn test_scan_excludes_non_constructible_and_framework_types() {
    let scanner = ExportScanner::new(startup_task(), vec![alpha_exports()]).unwrap();
    let matches = scanner.scan();

    let names: Vec<&str> = matches.iter().map(|r| r.impl_name.as_str()).collect();
    assert_eq!(names, vec!["plugin_a::AlphaTask"]);
    assert!(matches.iter().all(|r| r.is_constructible()));
}

#[test]
fn test_scan_private_types_gate() {
    let public_only = ExportScanner::new(startup_task(), vec![alpha_exports()])
        .unwrap()
        .scan();
    assert_eq!(public_only.len(), 1);

    let with_private = ExportScanner::new(startup_task(), vec![alpha_exports()])
        .unwrap()
        .include_private_types(true)
        .scan();
    assert_eq!(with_private.len(), 2);
}

#[test]
fn test_scan_multiple_export_tables_in_order() {
    let scanner =
        ExportScanner::new(startup_task(), vec![alpha_exports(), beta_exports()]).unwrap();
    let names: Vec<String> = scanner.scan().iter().map(|r| r.impl_name.clone()).collect();

    assert_eq!(
        names,
        vec![
            "plugin_a::AlphaTask",
            "plugin_b::BetaTask",
            "plugin_b::BetaSecondTask",
            "plugin_b::BrokenTask",
        ]
    );
}

#[test]
fn test_clear_filters_allows_framework_types() {
    let scanner = ExportScanner::new(startup_task(), vec![alpha_exports()])
        .unwrap()
        .clear_filters();
    let names: Vec<String> = scanner.scan().iter().map(|r| r.impl_name.clone()).collect();

    assert!(names.contains(&"std::marker::FrameworkTask".to_string()));
}

#[test]
fn test_added_filters_chain() {
    let scanner = ExportScanner::new(startup_task(), vec![alpha_exports(), beta_exports()])
        .unwrap()
        .add_filter(|registration| registration.impl_name.starts_with("plugin_b::"))
        .add_filter(|registration| !registration.impl_name.contains("Broken"));

    let names: Vec<String> = scanner.scan().iter().map(|r| r.impl_name.clone()).collect();
    assert_eq!(names, vec!["plugin_b::BetaTask", "plugin_b::BetaSecondTask"]);
}

#[test]
fn test_open_generic_request_matches_open_and_closed_impls() {
    let scanner = ExportScanner::new(open_contract(), vec![generic_exports()]).unwrap();
    let names: Vec<String> = scanner.scan().iter().map(|r| r.impl_name.clone()).collect();

    assert_eq!(names, vec!["plugin_g::ContractImpl", "plugin_g::ContractImplString"]);
}

#[test]
fn test_closed_request_skips_open_generic_templates() {
    let scanner = ExportScanner::new(closed_string_contract(), vec![generic_exports()]).unwrap();
    let names: Vec<String> = scanner.scan().iter().map(|r| r.impl_name.clone()).collect();

    assert_eq!(names, vec!["plugin_g::ContractImplString"]);
}

#[test]
fn test_empty_contract_name_is_precondition_violation() {
    let result = ExportScanner::new(ContractKey::new(""), vec![alpha_exports()]);
    assert!(matches!(result, Err(PluginError::InvalidArgument { .. })));
}

#[test]
fn test_empty_export_set_is_precondition_violation() {
    let result = ExportScanner::new(startup_task(), Vec::new());
    assert!(matches!(result, Err(PluginError::InvalidArgument { .. })));
}

#[test]
fn test_resolve_contract_rederives_closed_generic() {
    let registrations = generic_registrations();
    let open_impl = &registrations[0];
    let closed_impl = &registrations[1];

    // Closed implementation found for an open request registers under the
    // closed contract it actually declares
    assert_eq!(
        resolve_contract(&open_contract(), closed_impl),
        Some(closed_string_contract())
    );

    // Open implementation registers under the open definition
    assert_eq!(resolve_contract(&open_contract(), open_impl), Some(open_contract()));

    // Non-open requests register under the requested contract
    assert_eq!(
        resolve_contract(&closed_string_contract(), closed_impl),
        Some(closed_string_contract())
    );

    // Unrelated contracts resolve to nothing
    assert_eq!(resolve_contract(&startup_task(), closed_impl), None);
}
