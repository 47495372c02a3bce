use pinyin::ToPinyin;

/// Builds the text stored in `folders.search_key` for a display name.
///
/// Han characters become toneless pinyin syllables, joined without
/// separators ("项目" -> "xiangmu"); every other character is kept as is so
/// Latin names still match on themselves. Never fails: when the
/// transliteration produces nothing usable the name itself is returned.
pub fn derive_search_key(name: &str) -> String {
    let mut key = String::with_capacity(name.len());
    for ch in name.chars() {
        match ch.to_pinyin() {
            Some(syllable) => key.push_str(syllable.plain()),
            None => key.push(ch),
        }
    }

    if key.trim().is_empty() {
        return name.to_string();
    }
    key
}
