//! The default notification hook.
//!
//! Real deployments hand `MatchesReadyEvent`s to an external dispatcher (mailer, push service); this hook
//! renders a ranked summary to the log so a bare worker is still observably doing its job.
use std::{future::Future, pin::Pin};

use agromatch_engine::events::{EventHooks, MatchesReadyEvent};
use log::*;

pub fn register_log_notifier(hooks: &mut EventHooks) {
    hooks.on_matches_ready(|event: MatchesReadyEvent| {
        Box::pin(async move {
            let quotation = &event.quotation;
            info!(
                "📣️ {} matches ready for quotation #{} ({} t of {} from {})",
                event.matches.len(),
                quotation.id(),
                quotation.quantity_tons(),
                quotation.product.name,
                quotation.location.city
            );
            for (rank, m) in event.matches.iter().enumerate() {
                info!(
                    "📣️   {}. opportunity #{} ({}) — score {:.2}, {:.0} km, {:.2}/t{}",
                    rank + 1,
                    m.candidate.id(),
                    m.candidate.opportunity.name,
                    m.score,
                    m.distance_km,
                    m.price_per_ton,
                    if m.is_promoted { " [promoted]" } else { "" }
                );
            }
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
}
