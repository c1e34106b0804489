use crate::infra::{
    demo_origin, demo_snapshot, load_snapshot, parse_coordinates, parse_region, parse_sort_mode,
    parse_top_n, DataSource, InMemorySessionRepository,
};
use chrono::Local;
use clap::Args;
use er_triage::config::AppConfig;
use er_triage::error::AppError;
use er_triage::triage::{
    Backfill, CallOutcome, CandidateStatus, Coordinates, HospitalId, HospitalSnapshot,
    Placement, RankingConfig, Recommendation, Region, SessionId, SessionSnapshot, SortMode,
    SymptomCategory, SymptomRuleTable, TriageRequest, TriageService, TriageSession,
};
use std::sync::Arc;

type DemoService = TriageService<HospitalSnapshot, HospitalSnapshot, InMemorySessionRepository>;

#[derive(Args, Debug)]
pub(crate) struct RecommendArgs {
    /// Symptom category key (e.g. stroke, stemi, major_trauma)
    #[arg(long, default_value = "stroke")]
    pub(crate) symptom: String,
    /// Scene location as LAT,LON. Defaults to the demo district centre.
    #[arg(long, value_parser = parse_coordinates)]
    pub(crate) location: Option<Coordinates>,
    /// Region to search as PRIMARY or PRIMARY/SECONDARY
    #[arg(long, value_parser = parse_region)]
    pub(crate) region: Option<Region>,
    /// Street address, used to guess the region when none is given
    #[arg(long)]
    pub(crate) address: Option<String>,
    /// Ordering: suitability (default) or proximity
    #[arg(long, value_parser = parse_sort_mode)]
    pub(crate) sort: Option<SortMode>,
    /// Override the number of visible slots (at least 1)
    #[arg(long, value_parser = parse_top_n)]
    pub(crate) top_n: Option<usize>,
    /// Free-text field note appended to the handoff draft
    #[arg(long)]
    pub(crate) note: Option<String>,
    /// Print the full recommendation as JSON instead of a table
    #[arg(long)]
    pub(crate) json: bool,
    /// List the symptom categories and their facility checklists, then exit
    #[arg(long)]
    pub(crate) list_symptoms: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Symptom category to triage in the scripted call-around
    #[arg(long)]
    pub(crate) symptom: Option<String>,
    /// Ordering: suitability (default) or proximity
    #[arg(long, value_parser = parse_sort_mode)]
    pub(crate) sort: Option<SortMode>,
    /// Stop after the refusals without approving a hospital
    #[arg(long)]
    pub(crate) skip_approval: bool,
}

pub(crate) fn run_recommend(args: RecommendArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let rules = config.triage.load_rules()?;

    if args.list_symptoms {
        render_symptoms(&rules);
        return Ok(());
    }

    let (snapshot, source) = load_snapshot(&config.triage)?;
    let mut ranking = config.triage.ranking;
    if let Some(top_n) = args.top_n {
        ranking.top_n = top_n;
    }

    let region = match (args.region, source) {
        (Some(region), _) => Some(region),
        (None, DataSource::Demo) if args.address.is_none() => Some(Region::new("Gwangju", None)),
        (None, _) => None,
    };
    let request = TriageRequest {
        symptom: SymptomCategory::new(args.symptom),
        location: args.location.unwrap_or_else(demo_origin),
        region,
        address: args.address,
        sort_mode: args.sort,
        field_note: args.note,
    };

    let service = build_service(snapshot, rules, ranking);
    let mut session = TriageSession::new(SessionId::new("cli"), ranking.top_n);
    let recommendation = service.recommend_into(&mut session, &request)?;

    if args.json {
        match serde_json::to_string_pretty(&recommendation) {
            Ok(json) => println!("{json}"),
            Err(err) => println!("Recommendation payload unavailable: {err}"),
        }
        return Ok(());
    }

    println!(
        "Emergency room recommendation ({})",
        Local::now().format("%Y-%m-%d %H:%M")
    );
    render_recommendation(&recommendation);
    println!("\nHandoff draft:\n{}", recommendation.handoff);
    Ok(())
}

pub(crate) fn run_call_around_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        symptom,
        sort,
        skip_approval,
    } = args;

    let service = build_service(
        demo_snapshot()?,
        SymptomRuleTable::standard(),
        RankingConfig::default(),
    );
    let request = TriageRequest {
        symptom: SymptomCategory::new(symptom.unwrap_or_else(|| "stroke".to_string())),
        location: demo_origin(),
        region: Some(Region::new("Gwangju", None)),
        address: None,
        sort_mode: sort,
        field_note: Some("demo scene, patient conscious".to_string()),
    };

    println!("Emergency room call-around demo");
    let session = service.open_session()?.session_id;
    println!("- Opened session {session}");

    let recommendation = service.recommend(&session, &request)?;
    render_recommendation(&recommendation);

    for outcome in [CallOutcome::Refused, CallOutcome::Unreachable] {
        let Some(hospital_id) = next_pending(&service.session(&session)?) else {
            println!("\nNo pending hospital left to call");
            return Ok(());
        };
        call(&service, &session, &hospital_id, outcome)?;
    }

    println!("\nRefreshing the ranking after the refusals");
    let refreshed = service.recommend(&session, &request)?;
    println!(
        "- {} newly surfaced | {} rejected hospital(s) kept out",
        refreshed.surfaced.newly_surfaced.len(),
        refreshed.surfaced.skipped_rejected
    );

    if !skip_approval {
        if let Some(hospital_id) = next_pending(&service.session(&session)?) {
            call(&service, &session, &hospital_id, CallOutcome::Accepted)?;
        }
    }

    let snapshot = service.session(&session)?;
    println!("\nFinal session state");
    render_session(&snapshot);
    Ok(())
}

fn build_service(
    snapshot: HospitalSnapshot,
    rules: SymptomRuleTable,
    ranking: RankingConfig,
) -> DemoService {
    let snapshot = Arc::new(snapshot);
    TriageService::new(
        snapshot.clone(),
        snapshot,
        Arc::new(InMemorySessionRepository::default()),
        rules,
        ranking,
    )
}

fn call(
    service: &DemoService,
    session: &SessionId,
    hospital_id: &HospitalId,
    outcome: CallOutcome,
) -> Result<(), AppError> {
    service.begin_call(session, hospital_id)?;
    let report = service.record_outcome(session, hospital_id, outcome)?;
    println!(
        "\n- Called {} -> {:?}, now {}",
        hospital_id, outcome, report.status
    );
    match report.backfill {
        Some(Backfill::Promoted { hospital_id, slot }) => {
            println!("  Slot {} backfilled with {}", slot + 1, hospital_id)
        }
        Some(Backfill::PoolExhausted { slot }) => {
            println!("  Slot {} left empty: backup pool exhausted", slot + 1)
        }
        None => {}
    }
    if report.resolved {
        println!("  Session resolved");
    }
    Ok(())
}

fn next_pending(snapshot: &SessionSnapshot) -> Option<HospitalId> {
    snapshot
        .active
        .iter()
        .flatten()
        .find(|entry| entry.status == CandidateStatus::Pending)
        .map(|entry| entry.hospital_id.clone())
}

fn render_symptoms(rules: &SymptomRuleTable) {
    println!("Symptom categories");
    for rule in rules.rules() {
        let checklist = rule.checklist();
        println!("- {} | {}", rule.category, rule.label);
        println!("  {}", rule.summary);
        println!(
            "  Required: {}",
            checklist
                .required_equipment
                .iter()
                .chain(checklist.required_beds.iter())
                .copied()
                .collect::<Vec<_>>()
                .join(", ")
        );
        if !checklist.recommended.is_empty() {
            println!("  Recommended: {}", checklist.recommended.join(", "));
        }
    }
}

fn render_recommendation(recommendation: &Recommendation) {
    let outcome = &recommendation.outcome;
    println!(
        "- {} | region {} | {} ({} scanned, {} eligible, {} without coordinates)",
        recommendation.symptom_label,
        recommendation.region,
        outcome.sort_mode.label(),
        outcome.summary.scanned,
        outcome.summary.eligible,
        outcome.summary.missing_coordinates
    );
    for notice in &outcome.notices {
        println!("  Notice: {}", notice.describe());
    }

    for candidate in &outcome.ordered {
        let tag = match candidate.placement {
            Placement::Qualified => "",
            Placement::Padding | Placement::Fallback => " [requirements not met]",
        };
        let eta = recommendation
            .routes
            .iter()
            .find(|route| route.hospital_id == candidate.record.id)
            .map(|route| format!(", ~{} min", route.route.eta_minutes))
            .unwrap_or_default();
        println!(
            "  #{} {} | {:.2} km{} | score {:.1} | updated {}{}",
            candidate.rank,
            candidate.record.display_name(),
            candidate.distance_km,
            eta,
            candidate.score,
            candidate.record.freshness_label(),
            tag
        );
        for unmet in &candidate.unmet {
            println!("      missing: {}", unmet.describe());
        }
    }

    if !outcome.backup_pool.is_empty() {
        println!("  Backup pool:");
        for candidate in &outcome.backup_pool {
            println!(
                "    #{} {} ({:.2} km)",
                candidate.rank,
                candidate.record.display_name(),
                candidate.distance_km
            );
        }
    }
}

fn render_session(snapshot: &SessionSnapshot) {
    match &snapshot.approved {
        Some(hospital_id) => println!("- Approved by {hospital_id}"),
        None => println!("- No hospital approved yet"),
    }
    println!("- Contact history:");
    for entry in &snapshot.hospital_stack {
        println!(
            "  {} ({}) surfaced at #{} -> {}",
            entry.hospital_name, entry.hospital_id, entry.surfaced_at_rank, entry.status
        );
    }
    if !snapshot.rejected.is_empty() {
        let rejected: Vec<&str> = snapshot.rejected.iter().map(HospitalId::as_str).collect();
        println!("- Rejected: {}", rejected.join(", "));
    }
}
