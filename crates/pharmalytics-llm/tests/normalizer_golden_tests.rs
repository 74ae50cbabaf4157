//! Normalizer behavior on realistic completions.

use pharmalytics_llm::{
    normalize, parse_dosage_response, parse_extraction_response, parse_interaction_response,
    parse_risk_score, parse_side_effect_response, NormalizedResponse, TaskKind, NEUTRAL_RISK_SCORE,
};
use proptest::prelude::*;

const INTERACTION_COMPLETION: &str = r#"
As a clinical pharmacologist, analyze the potential drug interaction between:

Drug 1: Warfarin (5mg)
Drug 2: Aspirin (81mg)

Analysis:
1. Interaction Severity: Severe
2. Mechanism: Aspirin inhibits platelet aggregation and may displace warfarin from protein binding.
3. Clinical Effects: Markedly increased risk of major bleeding.
4. Recommendations:
   - Avoid routine combination
   - If required, use the lowest aspirin dose
5. Monitoring: INR, hemoglobin, signs of bleeding
"#;

#[test]
fn test_interaction_golden() {
    let analysis = parse_interaction_response(INTERACTION_COMPLETION);
    assert_eq!(analysis.severity.as_deref(), Some("severe"));
    assert_eq!(
        analysis.mechanism.as_deref(),
        Some("Aspirin inhibits platelet aggregation and may displace warfarin from protein binding.")
    );
    assert_eq!(
        analysis.clinical_effects.as_deref(),
        Some("Markedly increased risk of major bleeding.")
    );
    assert_eq!(
        analysis.recommendations,
        vec![
            "- Avoid routine combination".to_string(),
            "- If required, use the lowest aspirin dose".to_string(),
        ]
    );
    assert_eq!(
        analysis.monitoring.as_deref(),
        Some("INR, hemoglobin, signs of bleeding")
    );
}

#[test]
fn test_interaction_repeated_field_keeps_first() {
    let text = "Severity: Moderate\nMechanism: CYP3A4\nSeverity: Low";
    let analysis = parse_interaction_response(text);
    assert_eq!(analysis.severity.as_deref(), Some("moderate"));
}

#[test]
fn test_interaction_echoed_enumerators_skipped() {
    let text = "Recommendations:\n1.\nSeparate doses by 2 hours\n2. \nMonitoring: potassium";
    let analysis = parse_interaction_response(text);
    assert_eq!(analysis.recommendations, vec!["Separate doses by 2 hours".to_string()]);
    assert_eq!(analysis.monitoring.as_deref(), Some("potassium"));
}

#[test]
fn test_dosage_golden() {
    let text = "Recommendation:\n\
                1. Recommended Dose: 250mg every 8 hours\n\
                2. Route of Administration: Oral\n\
                3. Duration: 10 days\n\
                4. Special Considerations: Adjust for renal impairment\n\
                5. Monitoring Parameters: Rash, diarrhea";
    let dosage = parse_dosage_response(text);
    assert_eq!(dosage.dose.as_deref(), Some("250mg every 8 hours"));
    assert_eq!(dosage.route.as_deref(), Some("Oral"));
    assert_eq!(dosage.duration.as_deref(), Some("10 days"));
    assert_eq!(dosage.considerations.as_deref(), Some("Adjust for renal impairment"));
    assert_eq!(dosage.monitoring.as_deref(), Some("Rash, diarrhea"));
}

#[test]
fn test_side_effect_golden() {
    let text = "1. Common Side Effects:\n\
                Nausea (25%)\n\
                Diarrhea (15%)\n\
                2. Serious Side Effects: Lactic acidosis (<1%)\n\
                3. Patient-Specific Risks: Reduced renal clearance\n\
                4. Risk Score: 6/10\n\
                5. Precautions: Hold before contrast imaging";
    let analysis = parse_side_effect_response(text);
    assert_eq!(
        analysis.common_side_effects,
        vec!["Nausea (25%)".to_string(), "Diarrhea (15%)".to_string()]
    );
    assert_eq!(analysis.serious_side_effects, vec!["Lactic acidosis (<1%)".to_string()]);
    assert_eq!(analysis.patient_risks.as_deref(), Some("Reduced renal clearance"));
    assert_eq!(analysis.risk_score, Some(6));
    assert_eq!(analysis.precautions.as_deref(), Some("Hold before contrast imaging"));
}

#[test]
fn test_side_effect_unusable_score_is_neutral() {
    let analysis = parse_side_effect_response("Risk Score: high");
    assert_eq!(analysis.risk_score, Some(NEUTRAL_RISK_SCORE));

    let missing = parse_side_effect_response("Precautions: none");
    assert_eq!(missing.risk_score, None);
}

#[test]
fn test_risk_score_forms() {
    assert_eq!(parse_risk_score("7"), 7);
    assert_eq!(parse_risk_score("7/10"), 7);
    assert_eq!(parse_risk_score(" 10 / 10 "), 10);
    assert_eq!(parse_risk_score("0/10"), NEUTRAL_RISK_SCORE);
    assert_eq!(parse_risk_score("11"), NEUTRAL_RISK_SCORE);
    assert_eq!(parse_risk_score(""), NEUTRAL_RISK_SCORE);
}

#[test]
fn test_extraction_golden() {
    let text = "Extracted Medications:\n\
                - Medication: Metoprolol\n\
                - Dosage: 25mg\n\
                - Frequency: twice daily\n\
                - Route: oral\n\
                \n\
                - Medication: Furosemide\n\
                - Dosage: 40mg\n\
                - Frequency: once daily";
    let meds = parse_extraction_response(text);
    assert_eq!(meds.len(), 2);
    assert_eq!(meds[0].name, "Metoprolol");
    assert_eq!(meds[0].route.as_deref(), Some("oral"));
    assert_eq!(meds[1].name, "Furosemide");
    assert_eq!(meds[1].dosage.as_deref(), Some("40mg"));
    assert_eq!(meds[1].route, None);
}

#[test]
fn test_extraction_fields_before_first_record_ignored() {
    let text = "- Dosage: 10mg\n- Medication: Lisinopril";
    let meds = parse_extraction_response(text);
    assert_eq!(meds.len(), 1);
    assert_eq!(meds[0].name, "Lisinopril");
    assert_eq!(meds[0].dosage, None);
}

#[test]
fn test_normalize_dispatches_by_task() {
    match normalize(TaskKind::Extraction, "- Medication: Aspirin") {
        NormalizedResponse::Extraction { medications } => assert_eq!(medications.len(), 1),
        other => panic!("unexpected {:?}", other),
    }
    assert!(matches!(
        normalize(TaskKind::Dosage, ""),
        NormalizedResponse::Dosage(_)
    ));
}

#[test]
fn test_empty_and_garbage_input() {
    assert!(parse_interaction_response("").is_empty());
    assert!(parse_interaction_response("The model is currently loading.").is_empty());
    assert!(parse_extraction_response("no medications here").is_empty());
}

proptest! {
    #[test]
    fn prop_normalize_is_total(text in "\\PC*") {
        for task in [TaskKind::Interaction, TaskKind::Dosage, TaskKind::SideEffect, TaskKind::Extraction] {
            let _ = normalize(task, &text);
        }
    }

    #[test]
    fn prop_risk_score_in_range(raw in "\\PC{0,12}") {
        let score = parse_risk_score(&raw);
        prop_assert!((1..=10).contains(&score));
    }

    #[test]
    fn prop_labelled_lines_survive(
        lines in proptest::collection::vec("[A-Za-z ]{0,20}", 0..8),
        severity in "(Low|Moderate|High|Severe)",
    ) {
        let mut text = format!("Severity: {}\n", severity);
        text.push_str(&lines.join("\n"));
        let analysis = parse_interaction_response(&text);
        prop_assert_eq!(analysis.severity, Some(severity.to_lowercase()));
    }
}
