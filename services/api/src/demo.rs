use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::Args;
use dancebook::error::AppError;
use dancebook::workflows::attribution::{
    AttributionConfig, AttributionService, AttributionStore, EligibilityDecision, MemoryStore,
};

use crate::infra::{parse_instant, seed_demo_store};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Evaluation instant (RFC 3339). Defaults to now.
    #[arg(long, value_parser = parse_instant)]
    pub(crate) at: Option<DateTime<Utc>>,
    /// Skip the renumbering pass at the end of the demo.
    #[arg(long)]
    pub(crate) skip_rekey: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let at = args.at.unwrap_or_else(Utc::now);
    let store = Arc::new(MemoryStore::default());
    let seed = seed_demo_store(&store, at)?;
    let service = AttributionService::new(store.clone(), AttributionConfig::default());

    println!("Session attribution demo");
    println!("Evaluation instant: {at}");
    println!(
        "Seeded {} locations, {} users, {} upcoming sessions",
        seed.locations.len(),
        seed.users.len(),
        seed.sessions.len()
    );

    let report = service.run(at)?;
    println!("\nAttribution sweep");
    println!("- sessions past their deadline: {}", report.considered);
    for granted in &report.granted {
        println!(
            "- granted session {} to application {} (user {}, score {:.4})",
            granted.session_id, granted.application_id, granted.user_id, granted.score
        );
    }
    for pending in &report.pending {
        println!("- session {}: {}", pending.session_id, pending.cause.label());
    }
    for failure in &report.failures {
        println!("- session {} failed: {}", failure.session_id, failure.error);
    }

    if let Some(premium) = seed.sessions.get(1) {
        let preview = service.best_candidate(premium.id, at)?;
        println!("\nCandidate preview for session {}", premium.id);
        for candidate in &preview.ranked {
            println!(
                "- eligible: application {} (user {}, {}), location score {:.4}",
                candidate.application_id,
                candidate.user_name,
                candidate.tier.label(),
                candidate.sheet.location_score
            );
        }
        for candidate in &preview.deferred {
            let note = match &candidate.sheet.eligibility {
                EligibilityDecision::Deferred {
                    window_seconds,
                    reasons,
                } => format!(
                    "waiting for the last {}h window ({} clause(s))",
                    window_seconds / 3600,
                    reasons.len()
                ),
                EligibilityDecision::Barred => "no bidding rights".to_string(),
                EligibilityDecision::Eligible => "eligible".to_string(),
            };
            println!(
                "- held back: application {} (user {}, {}): {}",
                candidate.application_id,
                candidate.user_name,
                candidate.tier.label(),
                note
            );
        }
        if preview.ranked.is_empty() && preview.deferred.is_empty() {
            println!("- no active applications");
        }
    }

    if !args.skip_rekey {
        let rekey = service.rekey()?;
        println!(
            "\nRenumbering: {} of {} sessions moved",
            rekey.renumbered, rekey.total
        );
    }

    println!("\nFinal session table");
    for session in store.sessions()? {
        let winner = session
            .application_id
            .map(|id| format!("application {id}"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "- #{} {} {} at location {} | winner: {} | locked: {}",
            session.id,
            session.date,
            session.slot.label(),
            session.location_id,
            winner,
            session.locked.is_some()
        );
    }

    Ok(())
}
