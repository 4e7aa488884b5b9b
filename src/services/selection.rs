// src/services/selection.rs

use std::collections::HashSet;

use rand::{Rng, seq::SliceRandom};

use crate::error::AppError;

/// Draws `count` distinct question ids, preferring `preferred` and filling
/// any shortfall from `bank`.
///
/// Rejects a zero count or one larger than the bank instead of clamping.
pub fn pick_questions(preferred: &[i64], bank: &[i64], count: usize) -> Result<Vec<i64>, AppError> {
    pick_questions_with(&mut rand::thread_rng(), preferred, bank, count)
}

pub fn pick_questions_with<R: Rng + ?Sized>(
    rng: &mut R,
    preferred: &[i64],
    bank: &[i64],
    count: usize,
) -> Result<Vec<i64>, AppError> {
    if count == 0 {
        return Err(AppError::InvalidInput(
            "questionCount must be greater than zero".to_string(),
        ));
    }

    let bank = dedup(bank);
    if count > bank.len() {
        return Err(AppError::InvalidInput(format!(
            "questionCount {} exceeds the {} questions available",
            count,
            bank.len()
        )));
    }

    // Preferred ids outside the bank cannot be served.
    let in_bank: HashSet<i64> = bank.iter().copied().collect();
    let preferred: Vec<i64> = dedup(preferred)
        .into_iter()
        .filter(|id| in_bank.contains(id))
        .collect();

    let mut chosen: Vec<i64> = preferred.choose_multiple(rng, count).copied().collect();

    if chosen.len() < count {
        let taken: HashSet<i64> = chosen.iter().copied().collect();
        let rest: Vec<i64> = bank.into_iter().filter(|id| !taken.contains(id)).collect();
        chosen.extend(rest.choose_multiple(rng, count - chosen.len()).copied());
    }

    Ok(chosen)
}

fn dedup(ids: &[i64]) -> Vec<i64> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}
