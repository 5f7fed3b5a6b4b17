//! Debug/release decision for explicitly requested units

use crate::model::{BuildUnit, DeviceKind, TargetPlatform};
use crate::settings::{AndroidPackageType, IosPackageType, PackagingParameters};

const DEBUG_OPTIONS: [&str; 2] = ["debug", "compiler.debug"];

/// Whether `unit` is compiled with debug information
pub fn debug_status(unit: &BuildUnit, params: &PackagingParameters) -> bool {
    if unit.target_platform() != TargetPlatform::Mobile {
        return false;
    }

    let android_enabled = unit
        .packaging_options(DeviceKind::Android)
        .is_some_and(|options| options.enabled);

    if android_enabled {
        params.android_package_type != AndroidPackageType::Release
    } else {
        params.ios_package_type == IosPackageType::DebugOverNetwork
    }
}

/// Copy of `unit` whose additional options carry exactly one `-debug=<bool>`
pub fn with_forced_debug_status(unit: &BuildUnit, params: &PackagingParameters) -> BuildUnit {
    let debug = debug_status(unit, params);
    let remaining = remove_options(&unit.compiler_options.additional_options, &DEBUG_OPTIONS);

    let mut copy = unit.clone();
    copy.compiler_options.additional_options = format!("{} -debug={}", remaining, debug)
        .trim()
        .to_string();
    copy
}

/// Drop every occurrence of the named options from a command line.
///
/// Handles `-name`, `-name=v`, `-name+=v` and `+name=v`, plus a separate
/// `true`/`false` value following a bare `-name`.
pub fn remove_options(options: &str, names: &[&str]) -> String {
    let mut kept: Vec<&str> = Vec::new();
    let mut tokens = options.split_whitespace().peekable();

    while let Some(token) = tokens.next() {
        let Some(body) = token.strip_prefix('-').or_else(|| token.strip_prefix('+')) else {
            kept.push(token);
            continue;
        };

        let (name, has_value) = match body.find(['=', '+']) {
            Some(pos) => (&body[..pos], true),
            None => (body, false),
        };

        if !names.contains(&name) {
            kept.push(token);
            continue;
        }

        if !has_value {
            if let Some(next) = tokens.peek() {
                if matches!(*next, "true" | "false") {
                    let _ = tokens.next();
                }
            }
        }
    }

    kept.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DevicePackaging, Nature, OutputType, PackagingOptions};

    fn mobile_app(android_enabled: bool) -> BuildUnit {
        let mut unit = BuildUnit::new("Mobile", Nature::new(TargetPlatform::Mobile, OutputType::Application));
        let mut android = PackagingOptions::new(DevicePackaging::Android);
        android.enabled = android_enabled;
        unit.packaging.push(android);
        unit
    }

    fn params(android: AndroidPackageType, ios: IosPackageType) -> PackagingParameters {
        PackagingParameters {
            android_package_type: android,
            ios_package_type: ios,
        }
    }

    #[test]
    fn test_android_release_is_not_debug() {
        let forced = with_forced_debug_status(
            &mobile_app(true),
            &params(AndroidPackageType::Release, IosPackageType::DebugOverNetwork),
        );
        assert_eq!(forced.compiler_options.additional_options, "-debug=false");
    }

    #[test]
    fn test_other_android_types_are_debug() {
        for android in [AndroidPackageType::DebugOverUsb, AndroidPackageType::DebugOverNetwork] {
            let forced = with_forced_debug_status(&mobile_app(true), &params(android, IosPackageType::Test));
            assert_eq!(forced.compiler_options.additional_options, "-debug=true");
        }
    }

    #[test]
    fn test_ios_decides_when_android_disabled() {
        let unit = mobile_app(false);
        assert!(debug_status(&unit, &params(AndroidPackageType::Release, IosPackageType::DebugOverNetwork)));
        assert!(!debug_status(&unit, &params(AndroidPackageType::DebugOverUsb, IosPackageType::AdHoc)));
    }

    #[test]
    fn test_non_mobile_is_never_debug() {
        let mut unit = BuildUnit::new("Web", Nature::default());
        unit.compiler_options.additional_options = "-debug=true -locale=en_US".to_string();

        let forced = with_forced_debug_status(
            &unit,
            &params(AndroidPackageType::DebugOverUsb, IosPackageType::DebugOverNetwork),
        );
        assert_eq!(forced.compiler_options.additional_options, "-locale=en_US -debug=false");
        // Original untouched
        assert_eq!(unit.compiler_options.additional_options, "-debug=true -locale=en_US");
    }

    #[test]
    fn test_remove_options() {
        assert_eq!(
            remove_options(
                "-debug -compiler.debug=true +debug=false -debug true -define+=CONFIG::x,1 -debugger=y",
                &DEBUG_OPTIONS
            ),
            "-define+=CONFIG::x,1 -debugger=y"
        );
        assert_eq!(remove_options("", &DEBUG_OPTIONS), "");
        assert_eq!(remove_options("-optimize", &DEBUG_OPTIONS), "-optimize");
    }
}
