//! Hall augmentation — turns reverb-return track names into hall signals.
//!
//! A supplied name matches instrument `gtr` when it normalizes (lowercase,
//! spaces → underscores) to `gtr_hall`. Each match appends a signal that
//! feeds only `gtr_early`, scaled by the spec's hall gain.

use tracing::debug;

use crate::report::db_to_linear;
use crate::spec::{component_name, ComponentKind, Signal, Spec};

/// Normalize a track name for hall matching.
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase().replace(' ', "_")
}

/// Append one hall signal per matching track name, in track-list order.
///
/// Returns how many signals were added.
pub fn add_hall_signals<S: AsRef<str>>(spec: &mut Spec, track_names: &[S]) -> usize {
    let gain = db_to_linear(spec.hall_gain_db);
    let mut added = 0;

    for track in track_names {
        let track = track.as_ref();
        let normalized = normalize_name(track);

        let early = spec.instruments.iter().find_map(|inst| {
            if normalized == format!("{}_hall", inst.name) {
                spec.components
                    .get(&component_name(&inst.name, ComponentKind::Early))
            } else {
                None
            }
        });

        if let Some(early) = early {
            debug!(track, gain, "matched hall track");
            spec.signals.push(Signal::hall(track, early, gain));
            added += 1;
        }
    }

    added
}
