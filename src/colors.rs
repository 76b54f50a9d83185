//! Deterministic category → display color assignment.
//!
//! Known categories use a fixed table; unknown labels hash into a fallback
//! palette. The mapping must be stable across calls and process restarts so
//! the same category never changes color between refreshes.

/// Fallback palette for labels without a dedicated color.
const FALLBACK_PALETTE: [&str; 7] = [
    "#FFEB3B", "#8BC34A", "#FF9800", "#03A9F4", "#9C27B0", "#FF5722", "#607D8B",
];

/// Returns the display color for a category or expense label.
pub fn color_for(label: &str) -> &'static str {
    match label {
        "Fatura" => "#4CAF50",
        "Brilhete" => "#FF5722",
        "gastos diversos" => "#2196F3",
        "Aluguel" => "#1E3A8A",
        "Mercado" => "#388E3C",
        "Compras online" => "#7B1FA2",
        "Transporte" => "#0288D1",
        "Lazer" => "#FF5722",
        "Saúde" => "#00796B",
        "Educacao" => "#64B5F6",
        _ => fallback_color(label),
    }
}

fn fallback_color(label: &str) -> &'static str {
    let hash = label.chars().fold(0u32, |acc, c| acc.wrapping_add(c as u32));
    FALLBACK_PALETTE[hash as usize % FALLBACK_PALETTE.len()]
}
