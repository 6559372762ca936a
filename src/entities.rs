//! Named HTML entity table.
//!
//! Only a fixed set of names is recognized; unknown names pass through
//! the entity transform verbatim.

/// Look up a named entity, without `&`/`;` delimiters.
pub fn entity_from_name(name: &str) -> Option<char> {
    let ch = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "iexcl" => '¡',
        "cent" => '¢',
        "pound" => '£',
        "yen" => '¥',
        "sect" => '§',
        "copy" => '©',
        "laquo" => '«',
        "raquo" => '»',
        "reg" => '®',
        "deg" => '°',
        "plusmn" => '±',
        "sup2" => '²',
        "sup3" => '³',
        "micro" => 'µ',
        "para" => '¶',
        "middot" => '·',
        "frac14" => '¼',
        "frac12" => '½',
        "frac34" => '¾',
        "iquest" => '¿',
        "times" => '×',
        "divide" => '÷',
        "agrave" => 'à',
        "aacute" => 'á',
        "ccedil" => 'ç',
        "egrave" => 'è',
        "eacute" => 'é',
        "ndash" => '–',
        "mdash" => '—',
        "lsquo" => '\u{2018}',
        "rsquo" => '\u{2019}',
        "ldquo" => '\u{201c}',
        "rdquo" => '\u{201d}',
        "bull" => '•',
        "hellip" => '…',
        "dagger" => '†',
        "permil" => '‰',
        "prime" => '′',
        "euro" => '€',
        "trade" => '™',
        "larr" => '←',
        "uarr" => '↑',
        "rarr" => '→',
        "darr" => '↓',
        "harr" => '↔',
        _ => return None,
    };
    Some(ch)
}
