//! Human-readable output. JSON output goes straight through serde.

use atelier_core::{PresetTemplate, SpecificationError, ValidatedSpecification};
use atelier_gateway::{Artifacts, ArtifactStatus, Finalized, PricingCatalog, Quoted};

pub fn presets<'a>(templates: impl IntoIterator<Item = &'a PresetTemplate>) -> String {
    let mut out = String::new();
    for template in templates {
        out.push_str(&format!("{}  {}\n", template.id, template.label));
        for (slot, range) in template.dimension_ranges.iter().enumerate() {
            out.push_str(&format!(
                "    {:<11} {}–{} mm\n",
                template.slot_name(slot),
                range.min,
                range.max
            ));
        }
        let required = if template.required_flags.is_empty() {
            "none".to_string()
        } else {
            template.required_flags.to_string()
        };
        out.push_str(&format!(
            "    flags       {} (required: {})\n",
            template.allowed_flags, required
        ));
    }
    out
}

pub fn valid(spec: &ValidatedSpecification) -> String {
    format!("ok  {spec}\n")
}

/// Syntax errors get a caret under the offending character; validation
/// errors are listed with the field they belong to.
pub fn specification_error(code: &str, err: &SpecificationError) -> String {
    match err {
        SpecificationError::Syntax(syntax) => format!(
            "{code}\n{}^ {}\n",
            " ".repeat(syntax.position),
            syntax.reason
        ),
        SpecificationError::Invalid(errors) => {
            let mut out = format!("{code} is invalid:\n");
            for error in errors {
                out.push_str(&format!("  {:<16} {}\n", error.field(), error));
            }
            out
        }
    }
}

pub fn quote(quoted: &Quoted) -> String {
    let q = &quoted.quote;
    let mut out = format!(
        "{}\n  tier        {}\n  volume      {} m³ ({})\n  base        {}\n",
        quoted.spec, quoted.tier, q.volume_cubic_meters, q.height_policy, q.base_price
    );
    for line in quoted.supplements.lines() {
        let total = line
            .line_total()
            .map_or_else(|e| e.to_string(), |total| total.to_string());
        out.push_str(&format!("  + {} × {:<6} {}\n", line.quantity, line.id, total));
    }
    out.push_str(&format!("  total       {}\n", q.total_price));
    out
}

pub fn catalog(catalog: &PricingCatalog) -> String {
    let mut out = format!("tiers (default: {})\n", catalog.default_tier);
    for tier in catalog.tiers.iter() {
        out.push_str(&format!(
            "  {:<12} {:>8} /m³  {}\n",
            tier.name(),
            tier.price_per_cubic_meter(),
            tier.description()
        ));
    }
    out.push_str("supplements\n");
    for supplement in catalog.supplements.iter() {
        out.push_str(&format!(
            "  {:<12} {:>8}      {} ({})\n",
            supplement.id, supplement.unit_price, supplement.label, supplement.kind
        ));
    }
    out
}

pub fn artifacts(code: &str, artifacts: &Artifacts) -> String {
    match &artifacts.dxf_url {
        Some(dxf) => format!("{code}\n  glb  {}\n  dxf  {dxf}\n", artifacts.glb_url),
        None => format!("{code}\n  glb  {}\n", artifacts.glb_url),
    }
}

pub fn finalized(finalized: &Finalized) -> String {
    let mut out = format!(
        "stored {} as '{}' (id {})\n",
        finalized.quoted.spec, finalized.record.configuration.name, finalized.record.id
    );
    out.push_str(&quote(&finalized.quoted));
    match &finalized.artifacts {
        ArtifactStatus::Ready(a) => out.push_str(&artifacts("artifacts", a)),
        ArtifactStatus::Unavailable { reason } => {
            out.push_str(&format!("artifacts unavailable: {reason}\n"))
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use atelier_core::{check, PresetRegistry};
    use atelier_gateway::{Configurator, GatewayConfig, QuoteRequest};

    #[test]
    fn test_presets_listing() {
        let out = presets(PresetRegistry::builtin().iter());
        assert!(out.contains("M1  Free-standing shelving"));
        assert!(out.contains("flags       EFPTb (required: b)"));
        assert!(out.contains("(required: none)"));
    }

    #[test]
    fn test_syntax_error_caret() {
        let code = "M1(1000,,1000)b";
        let err = check(code).unwrap_err();
        let out = specification_error(code, &err);
        let caret_line = out.lines().nth(1).unwrap();
        assert_eq!(caret_line.find('^'), Some(8));
    }

    #[test]
    fn test_validation_errors_listed_by_field() {
        let code = "M1(1000,400,9000)E";
        let err = check(code).unwrap_err();
        let out = specification_error(code, &err);
        assert!(out.contains("dimensions[2]"));
        assert!(out.contains("flags.b"));
    }

    #[test]
    fn test_quote_output() {
        let config = GatewayConfig::default();
        let configurator = Configurator::from_config(&config).unwrap();
        let quoted = configurator
            .quote(
                "M1(1500,730,500)b",
                &QuoteRequest {
                    supplements: vec![("drawer".into(), 2)],
                    ..Default::default()
                },
            )
            .unwrap();

        let out = quote(&quoted);
        assert!(out.contains("volume      0.5475 m³ (declared_height)"));
        assert!(out.contains("base        821.25"));
        assert!(out.contains("  + 2 × drawer 90.00\n"));
        assert!(out.contains("total       911"));
        assert!(out.ends_with('\n'));
        assert_eq!(out.lines().count(), 6);
    }

    #[test]
    fn test_syntax_error_layout() {
        let code = "M1(1000,,1000)b";
        let err = check(code).unwrap_err();
        let out = specification_error(code, &err);
        assert_eq!(out.lines().count(), 2);
        assert_eq!(out.lines().next(), Some(code));
        assert!(out.ends_with('\n'));
    }

    #[test]
    fn test_artifacts_output() {
        let with_dxf = Artifacts {
            glb_url: "https://cdn.test/a.glb".into(),
            dxf_url: Some("https://cdn.test/a.dxf".into()),
        };
        assert_eq!(
            artifacts("M1(1000,400,1000)b", &with_dxf),
            "M1(1000,400,1000)b\n  glb  https://cdn.test/a.glb\n  dxf  https://cdn.test/a.dxf\n"
        );
    }

    #[test]
    fn test_catalog_output() {
        let pricing = GatewayConfig::default().pricing_catalog().unwrap();
        let out = catalog(&pricing);
        assert!(out.contains("tiers (default: standard)"));
        assert!(out.contains("oak"));
        assert!(out.contains("wardrobe_rail"));
    }
}
