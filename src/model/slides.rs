use super::job::AssetJob;

// White dominant gradients with subtle accents, one per slide.
pub const SLIDES: &[AssetJob] = &[
    AssetJob::new("02-architecture", "white gradient background with faint light blue geometric lines"),
    AssetJob::new("03-what-i-built", "white gradient background with faint light blue grid pattern"),
    AssetJob::new("04-how-i-built", "white gradient background with faint light blue circuit traces"),
    AssetJob::new("05-misconfigs", "white gradient background with faint light orange and blue corners"),
    AssetJob::new("06-app-vulns", "white gradient background with faint light blue binary dots"),
    AssetJob::new("07-security-controls", "white gradient background with faint light blue and green accents"),
    AssetJob::new("08-pipelines", "white gradient background with faint light blue flowing lines"),
    AssetJob::new("09-attack-chain", "white gradient background with faint light red chain links at edges"),
    AssetJob::new("10-live-demo", "white gradient background with faint light blue terminal cursor"),
    AssetJob::new("11-business-risks", "white gradient background with faint light red downward lines"),
    AssetJob::new("12-wiz-value", "white gradient background with faint light blue cloud shapes"),
    AssetJob::new("13-challenges", "white gradient background with faint light blue puzzle outlines"),
    AssetJob::new("14-do-differently", "white gradient background with faint light green upward arrows"),
    AssetJob::new("15-bonus-slides", "white gradient background with faint light blue code brackets and gear shapes"),
    AssetJob::new("16-resources", "white gradient background with faint light blue bookmark shapes"),
];

/// Restricts `SLIDES` to the given names, keeping catalogue order.
/// Returns the first unknown name as the error.
pub fn select(names: &[String]) -> Result<Vec<AssetJob>, String> {
    if names.is_empty() {
        return Ok(SLIDES.to_vec());
    }

    if let Some(unknown) = names.iter().find(|n| !SLIDES.iter().any(|s| s.name == n.as_str())) {
        return Err(unknown.clone());
    }

    Ok(SLIDES
        .iter()
        .filter(|s| names.iter().any(|n| n == s.name))
        .copied()
        .collect())
}
