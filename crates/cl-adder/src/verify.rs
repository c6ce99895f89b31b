use std::fmt;

/// Ergebnis der Host-Prüfung.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    Correct,
    /// erste Abweichung; bei unterschiedlichen Längen der Index hinter dem kürzeren Slice
    Incorrect { index: usize },
}

impl Verdict {
    pub fn is_correct(&self) -> bool {
        matches!(self, Verdict::Correct)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Correct => write!(f, "Data is correct"),
            Verdict::Incorrect { index } => {
                write!(f, "Data is incorrect (first mismatch at index {index})")
            }
        }
    }
}

/// Prüft `a[i] + b[i] == result[i]` mit exakter Gleichheit und bricht beim
/// ersten Fehler ab. Host und Gerät rechnen beide IEEE-754 `f32`.
pub fn verify_sum(a: &[f32], b: &[f32], result: &[f32]) -> Verdict {
    let n = a.len().min(b.len()).min(result.len());
    if let Some(index) = (0..n).find(|&i| a[i] + b[i] != result[i]) {
        return Verdict::Incorrect { index };
    }
    if a.len() != n || b.len() != n || result.len() != n {
        return Verdict::Incorrect { index: n };
    }
    Verdict::Correct
}
