//! Classification engine: an ordered rule list evaluated first-match-wins.
//!
//! The list encodes two branches. Rules 1-3 sit under the vendor-family guard
//! (display name matches the product pattern or contains the family term).
//! Rules 4-5 only apply when that guard is false.
//!
//! Rule 4 requires a product-pattern match while its own guard requires the
//! family guard to be false, and the family guard already includes the
//! product-pattern match. It therefore never decides a verdict. It stays in the
//! list so the precedence is visible here rather than hidden in branch nesting.

use regex::{Regex, RegexBuilder};
use serde::Serialize;

use crate::core::config::VendorConfig;
use crate::core::errors::{Result, RrhError};
use crate::scanner::version::{NormalizedVersion, VersionOutcome};
use crate::store::{RegistrationEntry, SystemComponentFlag};

/// Reason recorded for a family match that survived both exclusions.
pub const REASON_FAMILY_RESIDUE: &str =
    "general pattern match, not excluded by version or visibility";
/// Reason recorded for the (unreachable) hidden product-pattern rule.
pub const REASON_HIDDEN_PATTERN: &str =
    "product pattern match on hidden component within version threshold";
/// Reason recorded for a hidden component produced by the vendor packaging tool.
pub const REASON_PACKAGED_COMPONENT: &str =
    "vendor publisher with packaging-tool marker on hidden component within version threshold";

// ──────────────────── vendor profile ────────────────────

/// Vendor-specific constants the rules are evaluated against.
#[derive(Debug, Clone)]
pub struct VendorProfile {
    product_pattern: Regex,
    family_term: String,
    publisher_legal_name: String,
    packaging_marker: String,
    version_threshold: NormalizedVersion,
}

impl VendorProfile {
    /// Compile a profile. Fails on a bad pattern or threshold.
    pub fn new(
        product_pattern: &str,
        family_term: &str,
        publisher_legal_name: &str,
        packaging_marker: &str,
        version_threshold: &str,
    ) -> Result<Self> {
        let product_pattern = RegexBuilder::new(product_pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| RrhError::InvalidConfig {
                details: format!("vendor.product_pattern {product_pattern:?}: {e}"),
            })?;
        let version_threshold =
            version_threshold
                .parse::<NormalizedVersion>()
                .map_err(|e| RrhError::InvalidConfig {
                    details: format!("vendor.version_threshold: {e}"),
                })?;
        Ok(Self {
            product_pattern,
            family_term: family_term.trim().to_lowercase(),
            publisher_legal_name: publisher_legal_name.trim().to_lowercase(),
            packaging_marker: packaging_marker.trim().to_lowercase(),
            version_threshold,
        })
    }

    /// Profile from the `[vendor]` config section.
    pub fn from_config(config: &VendorConfig) -> Result<Self> {
        Self::new(
            &config.product_pattern,
            &config.family_term,
            &config.publisher_legal_name,
            &config.packaging_marker,
            &config.version_threshold,
        )
    }

    /// Parsed version threshold.
    #[must_use]
    pub const fn version_threshold(&self) -> &NormalizedVersion {
        &self.version_threshold
    }
}

// ──────────────────── verdict ────────────────────

/// Matched/unmatched verdict for one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationVerdict {
    /// Whether the entry is residue.
    pub matched: bool,
    /// Set only when matched.
    pub reason: Option<String>,
    /// Name of the rule that decided the verdict, `None` when no rule fired.
    pub rule: Option<&'static str>,
}

impl ClassificationVerdict {
    /// Verdict when no rule fired.
    #[must_use]
    pub const fn unmatched() -> Self {
        Self {
            matched: false,
            reason: None,
            rule: None,
        }
    }
}

// ──────────────────── rules ────────────────────

/// What a rule decides once its predicate holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleOutcome {
    /// Stop evaluating; the entry is not residue.
    Exclude,
    /// The entry is residue, for the given reason.
    Match(&'static str),
}

/// Everything a predicate may look at: one entry, its version, the profile.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    /// Vendor constants.
    pub profile: &'a VendorProfile,
    /// Entry under classification.
    pub entry: &'a RegistrationEntry,
    /// Parsed version, `None` when absent or unparseable.
    pub version: Option<&'a NormalizedVersion>,
}

impl RuleContext<'_> {
    fn display_name(&self) -> Option<&str> {
        self.entry.display_name.as_deref()
    }

    fn matches_product_pattern(&self) -> bool {
        self.display_name()
            .is_some_and(|name| self.profile.product_pattern.is_match(name))
    }

    fn contains_family_term(&self) -> bool {
        self.display_name()
            .is_some_and(|name| contains_ignore_case(name, &self.profile.family_term))
    }

    /// The branch guard: named, and product pattern or family term.
    pub fn in_vendor_family(&self) -> bool {
        self.matches_product_pattern() || self.contains_family_term()
    }

    fn version_above_threshold(&self) -> bool {
        self.version
            .is_some_and(|v| *v > self.profile.version_threshold)
    }

    fn version_within_threshold(&self) -> bool {
        self.version
            .is_some_and(|v| *v <= self.profile.version_threshold)
    }

    fn flag(&self) -> SystemComponentFlag {
        self.entry.system_component
    }

    fn published_by_vendor(&self) -> bool {
        self.entry
            .publisher
            .as_deref()
            .is_some_and(|p| p.trim().to_lowercase() == self.profile.publisher_legal_name)
    }

    fn has_packaging_marker(&self) -> bool {
        self.entry
            .comments
            .as_deref()
            .is_some_and(|c| contains_ignore_case(c, &self.profile.packaging_marker))
    }

    fn outside_family_within_threshold(&self) -> bool {
        self.display_name().is_some() && !self.in_vendor_family() && self.version_within_threshold()
    }
}

/// One predicate + outcome pair.
#[derive(Clone, Copy)]
pub struct ClassificationRule {
    /// Stable rule name, recorded in verdicts.
    pub name: &'static str,
    predicate: fn(&RuleContext<'_>) -> bool,
    /// Decision once the predicate holds.
    pub outcome: RuleOutcome,
}

impl ClassificationRule {
    /// Whether this rule's predicate holds, ignoring earlier rules.
    #[must_use]
    pub fn applies(&self, ctx: &RuleContext<'_>) -> bool {
        (self.predicate)(ctx)
    }
}

impl std::fmt::Debug for ClassificationRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassificationRule")
            .field("name", &self.name)
            .field("outcome", &self.outcome)
            .finish_non_exhaustive()
    }
}

/// The rule list, in evaluation order.
pub const RULES: &[ClassificationRule] = &[
    ClassificationRule {
        name: "family-newer-than-threshold",
        predicate: |ctx| ctx.in_vendor_family() && ctx.version_above_threshold(),
        outcome: RuleOutcome::Exclude,
    },
    ClassificationRule {
        name: "family-visible-component",
        predicate: |ctx| ctx.in_vendor_family() && ctx.flag() == SystemComponentFlag::Zero,
        outcome: RuleOutcome::Exclude,
    },
    ClassificationRule {
        name: "family-residue",
        predicate: |ctx| ctx.in_vendor_family(),
        outcome: RuleOutcome::Match(REASON_FAMILY_RESIDUE),
    },
    ClassificationRule {
        name: "hidden-pattern-component",
        predicate: |ctx| {
            ctx.outside_family_within_threshold()
                && ctx.matches_product_pattern()
                && ctx.flag() == SystemComponentFlag::One
        },
        outcome: RuleOutcome::Match(REASON_HIDDEN_PATTERN),
    },
    ClassificationRule {
        name: "packaged-hidden-component",
        predicate: |ctx| {
            ctx.outside_family_within_threshold()
                && ctx.published_by_vendor()
                && ctx.has_packaging_marker()
                && ctx.flag() == SystemComponentFlag::One
        },
        outcome: RuleOutcome::Match(REASON_PACKAGED_COMPONENT),
    },
];

// ──────────────────── classifier ────────────────────

/// Stateless classifier over a vendor profile and a rule list.
#[derive(Debug, Clone)]
pub struct Classifier {
    profile: VendorProfile,
    rules: &'static [ClassificationRule],
}

impl Classifier {
    /// Classifier over the standard rule list.
    #[must_use]
    pub const fn new(profile: VendorProfile) -> Self {
        Self {
            profile,
            rules: RULES,
        }
    }

    /// Vendor constants in use.
    #[must_use]
    pub const fn profile(&self) -> &VendorProfile {
        &self.profile
    }

    /// Rules in evaluation order.
    #[must_use]
    pub const fn rules(&self) -> &'static [ClassificationRule] {
        self.rules
    }

    /// Classify one entry. Unparseable versions are treated as absent.
    #[must_use]
    pub fn classify(
        &self,
        entry: &RegistrationEntry,
        version: &VersionOutcome,
    ) -> ClassificationVerdict {
        let ctx = RuleContext {
            profile: &self.profile,
            entry,
            version: version.parsed(),
        };
        let Some(rule) = self.rules.iter().find(|rule| rule.applies(&ctx)) else {
            return ClassificationVerdict::unmatched();
        };
        match rule.outcome {
            RuleOutcome::Exclude => ClassificationVerdict {
                matched: false,
                reason: None,
                rule: Some(rule.name),
            },
            RuleOutcome::Match(reason) => ClassificationVerdict {
                matched: true,
                reason: Some(reason.to_string()),
                rule: Some(rule.name),
            },
        }
    }
}

fn contains_ignore_case(haystack: &str, lowercase_needle: &str) -> bool {
    !lowercase_needle.is_empty() && haystack.to_lowercase().contains(lowercase_needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::version::normalize;
    use proptest::prelude::*;

    fn classifier() -> Classifier {
        Classifier::new(VendorProfile::from_config(&VendorConfig::default()).unwrap())
    }

    fn verdict(entry: &RegistrationEntry) -> ClassificationVerdict {
        classifier().classify(entry, &normalize(entry.display_version.as_deref()))
    }

    fn entry(name: &str, version: Option<&str>, flag: SystemComponentFlag) -> RegistrationEntry {
        let mut e = RegistrationEntry::new(format!(r"HKLM\Uninstall\{name}"))
            .with_display_name(name)
            .with_system_component(flag);
        e.display_version = version.map(str::to_string);
        e
    }

    fn packaged(name: &str, version: Option<&str>) -> RegistrationEntry {
        entry(name, version, SystemComponentFlag::One)
            .with_publisher("Adobe Inc.")
            .with_comments("Built with Creative Cloud Packager 1.9")
    }

    #[test]
    fn family_entry_at_threshold_matches() {
        let v = verdict(&entry("Adobe Photoshop CC", Some("1.0.0"), SystemComponentFlag::One));
        assert!(v.matched);
        assert_eq!(v.reason.as_deref(), Some(REASON_FAMILY_RESIDUE));
        assert_eq!(v.rule, Some("family-residue"));
    }

    #[test]
    fn family_entry_above_threshold_is_excluded() {
        let v = verdict(&entry("Adobe Creative Cloud", Some("5.2.0"), SystemComponentFlag::One));
        assert!(!v.matched);
        assert_eq!(v.reason, None);
        assert_eq!(v.rule, Some("family-newer-than-threshold"));
    }

    #[test]
    fn visible_family_entry_is_excluded() {
        let v = verdict(&entry("Adobe Creative Cloud", Some("1.0.0"), SystemComponentFlag::Zero));
        assert!(!v.matched);
        assert_eq!(v.rule, Some("family-visible-component"));
    }

    #[test]
    fn absent_version_is_exclusion_neutral() {
        let v = verdict(&entry("Illustrator Helper", None, SystemComponentFlag::One));
        assert!(v.matched);
    }

    #[test]
    fn unparseable_version_is_exclusion_neutral() {
        let v = verdict(&entry("Adobe Bridge", Some("CC 2019 build"), SystemComponentFlag::Absent));
        assert!(v.matched);
    }

    #[test]
    fn absent_flag_does_not_exclude_family_entry() {
        let v = verdict(&entry("Acrobat Update Helper", Some("0.9"), SystemComponentFlag::Absent));
        assert!(v.matched);
    }

    #[test]
    fn family_term_alone_opens_the_guard() {
        let v = verdict(&entry("creative cloud files", None, SystemComponentFlag::One));
        assert!(v.matched);
        assert_eq!(v.rule, Some("family-residue"));
    }

    #[test]
    fn padded_zero_version_is_not_above_threshold() {
        let v = verdict(&entry("Adobe Creative Cloud", Some("1.0.0000"), SystemComponentFlag::One));
        assert!(v.matched);
    }

    #[test]
    fn unrelated_product_is_unmatched_without_reason() {
        let v = verdict(&entry("7-Zip 23.01", Some("23.01"), SystemComponentFlag::Absent));
        assert_eq!(v, ClassificationVerdict::unmatched());
    }

    #[test]
    fn nameless_entry_is_unmatched() {
        let e = RegistrationEntry::new(r"HKLM\Uninstall\{X}")
            .with_publisher("Adobe Inc.")
            .with_comments("Creative Cloud Packager")
            .with_display_version("1.0")
            .with_system_component(SystemComponentFlag::One);
        assert_eq!(verdict(&e), ClassificationVerdict::unmatched());
    }

    #[test]
    fn packaged_hidden_component_matches_outside_family() {
        let v = verdict(&packaged("Shared Runtime Component", Some("1.0")));
        assert!(v.matched);
        assert_eq!(v.rule, Some("packaged-hidden-component"));
        assert_eq!(v.reason.as_deref(), Some(REASON_PACKAGED_COMPONENT));
    }

    #[test]
    fn packaged_component_requires_parseable_version() {
        assert!(!verdict(&packaged("Shared Runtime Component", None)).matched);
        assert!(!verdict(&packaged("Shared Runtime Component", Some("n/a"))).matched);
    }

    #[test]
    fn packaged_component_above_threshold_is_unmatched() {
        assert!(!verdict(&packaged("Shared Runtime Component", Some("1.0.1"))).matched);
    }

    #[test]
    fn packaged_component_requires_hidden_flag() {
        let mut e = packaged("Shared Runtime Component", Some("1.0"));
        e.system_component = SystemComponentFlag::Absent;
        assert!(!verdict(&e).matched);
    }

    #[test]
    fn packaged_component_requires_exact_publisher() {
        let mut e = packaged("Shared Runtime Component", Some("1.0"));
        e.publisher = Some("Adobe Systems".to_string());
        assert!(!verdict(&e).matched);
        e.publisher = Some("  ADOBE INC. ".to_string());
        assert!(verdict(&e).matched);
    }

    #[test]
    fn rules_are_evaluated_in_declared_order() {
        let names: Vec<_> = RULES.iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            vec![
                "family-newer-than-threshold",
                "family-visible-component",
                "family-residue",
                "hidden-pattern-component",
                "packaged-hidden-component",
            ]
        );
    }

    #[test]
    fn invalid_product_pattern_is_config_error() {
        let err = VendorProfile::new("(unclosed", "x", "y", "z", "1.0.0").unwrap_err();
        assert_eq!(err.code(), "RRH-1001");
    }

    #[test]
    fn invalid_threshold_is_config_error() {
        let err = VendorProfile::new("adobe", "x", "y", "z", "one").unwrap_err();
        assert_eq!(err.code(), "RRH-1001");
    }

    fn arb_flag() -> impl Strategy<Value = SystemComponentFlag> {
        prop_oneof![
            Just(SystemComponentFlag::Absent),
            Just(SystemComponentFlag::Zero),
            Just(SystemComponentFlag::One),
        ]
    }

    fn arb_entry() -> impl Strategy<Value = RegistrationEntry> {
        let names = prop_oneof![
            Just(None),
            Just(Some("Adobe Photoshop CC".to_string())),
            Just(Some("Creative Cloud Helper".to_string())),
            Just(Some("Illustrator".to_string())),
            Just(Some("Shared Runtime Component".to_string())),
            "[a-zA-Z ]{0,16}".prop_map(Some),
        ];
        let versions = prop_oneof![
            Just(None),
            Just(Some("1.0.0".to_string())),
            Just(Some("1.0.0000".to_string())),
            Just(Some("0.9".to_string())),
            Just(Some("5.2.0".to_string())),
            "[0-9.a-z]{0,8}".prop_map(Some),
        ];
        let publishers = prop_oneof![Just(None), Just(Some("Adobe Inc.".to_string()))];
        let comments = prop_oneof![
            Just(None),
            Just(Some("Creative Cloud Packager".to_string()))
        ];
        (names, versions, arb_flag(), publishers, comments).prop_map(
            |(display_name, display_version, system_component, publisher, comments)| {
                RegistrationEntry {
                    path: r"HKLM\Uninstall\{P}".to_string(),
                    display_name,
                    display_version,
                    system_component,
                    publisher,
                    comments,
                }
            },
        )
    }

    proptest! {
        #[test]
        fn classification_is_deterministic(e in arb_entry()) {
            let c = classifier();
            let version = normalize(e.display_version.as_deref());
            prop_assert_eq!(c.classify(&e, &version), c.classify(&e, &version));
        }

        #[test]
        fn reason_present_iff_matched(e in arb_entry()) {
            let v = verdict(&e);
            prop_assert_eq!(v.matched, v.reason.is_some());
        }

        #[test]
        fn hidden_pattern_rule_never_decides(e in arb_entry()) {
            let c = classifier();
            let version = normalize(e.display_version.as_deref());
            let ctx = RuleContext { profile: c.profile(), entry: &e, version: version.parsed() };
            prop_assert!(!RULES[3].applies(&ctx));
            prop_assert_ne!(c.classify(&e, &version).rule, Some("hidden-pattern-component"));
        }

        #[test]
        fn unparseable_version_classifies_like_absent(e in arb_entry()) {
            let c = classifier();
            let version = normalize(e.display_version.as_deref());
            if matches!(version, VersionOutcome::Unparseable { .. }) {
                let mut without = e.clone();
                without.display_version = None;
                prop_assert_eq!(
                    c.classify(&e, &version),
                    c.classify(&without, &VersionOutcome::Absent)
                );
            }
        }
    }
}
