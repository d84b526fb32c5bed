//! Packing deduplicated units into bounded embedding batches.

use crate::core::config::BatchLimits;
use crate::core::error::{Error, Result};
use crate::indexing::chunker::TextUnit;
use crate::indexing::tokens::estimate_tokens;

/// A group of units submitted together to the embedding backend.
#[derive(Debug, Clone)]
pub struct Batch {
    pub units: Vec<TextUnit>,
    /// 1-based position in the planned sequence.
    pub sequence: usize,
    pub estimated_tokens: usize,
    pub estimated_chars: usize,
}

/// Greedily pack units into batches bounded by count, characters, and
/// estimated tokens, preserving input order within and across batches.
///
/// A unit joins the current batch while the batch is empty, or while adding
/// it keeps the running sums within limits and the unit count below
/// `max_units`. A single unit that alone exceeds `max_chars` or
/// `max_tokens` cannot be placed anywhere and is a fatal error, never
/// silently truncated or dropped.
pub fn plan_batches(units: Vec<TextUnit>, limits: &BatchLimits) -> Result<Vec<Batch>> {
    fn close(
        current: &mut Vec<TextUnit>,
        chars: &mut usize,
        tokens: &mut usize,
        batches: &mut Vec<Batch>,
    ) {
        if current.is_empty() {
            return;
        }
        batches.push(Batch {
            units: std::mem::take(current),
            sequence: batches.len() + 1,
            estimated_tokens: *tokens,
            estimated_chars: *chars,
        });
        *chars = 0;
        *tokens = 0;
    }

    let mut batches = Vec::new();
    let mut current: Vec<TextUnit> = Vec::new();
    let mut chars = 0usize;
    let mut tokens = 0usize;

    for unit in units {
        let unit_chars = unit.text.chars().count();
        let unit_tokens = estimate_tokens(&unit.text);
        if unit_chars > limits.max_chars || unit_tokens > limits.max_tokens {
            return Err(Error::BatchTooLarge {
                chars: unit_chars,
                tokens: unit_tokens,
            });
        }

        let fits = current.len() < limits.max_units
            && chars + unit_chars <= limits.max_chars
            && tokens + unit_tokens <= limits.max_tokens;
        if !current.is_empty() && !fits {
            close(&mut current, &mut chars, &mut tokens, &mut batches);
        }

        chars += unit_chars;
        tokens += unit_tokens;
        current.push(unit);
    }
    close(&mut current, &mut chars, &mut tokens, &mut batches);

    Ok(batches)
}
