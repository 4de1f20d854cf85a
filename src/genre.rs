//! Cuisine to music genre mapping.
//!
//! The genres are Spotify seed genres. Anything not in the table, including an
//! empty label, maps to [`DEFAULT_GENRE`].

pub const DEFAULT_GENRE: &str = "pop";

const CUISINE_GENRES: &[(&str, &str)] = &[
    ("italian", "classical"),
    ("mexican", "latin"),
    ("japanese", "j-pop"),
    ("indian", "indian"),
    ("american", "country"),
    ("french", "jazz"),
    ("chinese", "chill"),
    ("thai", "party"),
    ("korean", "k-pop"),
    ("greek", "world-music"),
    ("brazilian", "samba"),
    ("spanish", "spanish"),
    ("mediterranean", "romance"),
    ("caribbean", "reggae"),
    ("vietnamese", "study"),
    ("german", "german"),
    ("british", "rock"),
    ("turkish", "turkish"),
    ("moroccan", "world-music"),
    ("lebanese", "soul"),
    ("ethiopian", "afrobeat"),
    ("nigerian", "afrobeat"),
    ("filipino", "philippines-opm"),
    ("indonesian", "world-music"),
    ("hawaiian", "summer"),
    ("russian", "pop"),
    ("canadian", "folk"),
    ("irish", "songwriter"),
    ("cuban", "salsa"),
    ("argentinian", "tango"),
    ("brazil", "bossanova"),
    ("australian", "indie"),
    ("swedish", "swedish"),
    ("middleeastern", "world-music"),
    ("african", "afrobeat"),
    // Spoonacular cuisine labels not covered above
    ("latinamerican", "latin"),
    ("southern", "country"),
    ("cajun", "blues"),
    ("european", "classical"),
    ("easterneuropean", "folk"),
    ("nordic", "swedish"),
    ("jewish", "world-music"),
];

/// Maps a cuisine label to a genre.
///
/// Matching ignores case, whitespace and hyphens, so `"Middle Eastern"` and
/// `"middle-eastern"` both hit the `middleeastern` entry.
pub fn map_cuisine_to_genre(cuisine: &str) -> &'static str {
    let key = normalize(cuisine);
    CUISINE_GENRES
        .iter()
        .find(|(c, _)| *c == key)
        .map(|(_, g)| *g)
        .unwrap_or(DEFAULT_GENRE)
}

fn normalize(cuisine: &str) -> String {
    cuisine
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}
