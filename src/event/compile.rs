//! Timeline compiler — pattern grids to absolute-time events.

use tracing::debug;

use super::time_base::{Offset, TimeBase};
use super::timeline::Timeline;
use super::types::CompiledEvent;
use crate::error::Result;
use crate::model::{Composition, Pattern};

/// Compile one pattern. `index` is its position in the composition.
///
/// The pattern is validated first; the Nth hit takes the Nth velocity and pan
/// entry. Returns events in ascending offset order.
pub fn compile_pattern<T: TimeBase>(
    index: usize,
    pattern: &Pattern,
    time_base: &T,
) -> Result<Vec<CompiledEvent<T::Offset>>> {
    pattern.validate(index)?;
    Ok(emit(index, pattern, time_base))
}

/// Events of an already validated pattern.
fn emit<T: TimeBase>(index: usize, pattern: &Pattern, time_base: &T) -> Vec<CompiledEvent<T::Offset>> {
    let Ok(steps) = pattern.steps_per_bar() else {
        return Vec::new();
    };
    let step = time_base.step_length(steps, pattern.triplet);

    pattern
        .hits
        .iter()
        .enumerate()
        .filter(|&(_, &flag)| flag == 1)
        .map(|(i, _)| i as u32)
        .zip(pattern.velocities.iter().zip(&pattern.panning))
        .map(|(i, (&velocity, &pan))| CompiledEvent {
            offset: time_base.offset(i, steps, pattern.triplet),
            note: pattern.note,
            velocity,
            pan,
            channel: pattern.channel,
            pattern: index,
            step,
        })
        .collect()
}

/// End of a pattern's grid in the given time base.
fn pattern_span<T: TimeBase>(pattern: &Pattern, time_base: &T) -> T::Offset {
    match pattern.steps_per_bar() {
        Ok(steps) => time_base.offset(pattern.divisions, steps, pattern.triplet),
        Err(_) => T::Offset::ZERO,
    }
}

/// Compile a whole composition into one merged timeline.
///
/// Every pattern is validated before any event is produced, so an invalid
/// composition never yields a partial timeline.
pub fn compile<T: TimeBase>(composition: &Composition, time_base: &T) -> Result<Timeline<T::Offset>> {
    composition.validate()?;

    let parts: Vec<_> = composition
        .patterns()
        .iter()
        .enumerate()
        .map(|(index, pattern)| emit(index, pattern, time_base))
        .collect();

    let span = composition
        .patterns()
        .iter()
        .map(|p| pattern_span(p, time_base))
        .fold(T::Offset::ZERO, |acc, s| if s > acc { s } else { acc });

    let timeline = Timeline::merge(parts, span);
    debug!(
        patterns = composition.patterns().len(),
        events = timeline.len(),
        span = ?timeline.span(),
        "compiled timeline"
    );
    Ok(timeline)
}
