//! Grid reference to descent-path translation.
//!
//! A textual national-grid reference (letters plus digits, length varying
//! by country and precision) translates into an ordered sequence of
//! per-level cell indices, one per precision level the reference encodes:
//!
//! - index 0: 100 km cell within the country grid (row-major)
//! - index 1: hectad within the 100 km cell (`x * 10 + y`)
//! - index 2: tetrad within the hectad (DINTY letter, or halved monad digits)
//! - index 3: monad within the tetrad (`x * 2 + y`)
//! - index 4+: successive 10x10 subdivisions (100 m, 10 m, 1 m)
//!
//! Point lookups feed these indices straight into node child tables, so
//! the index conventions here and in `quadrat_common::precision` are the
//! same functions of `(x, y)`.

use quadrat_common::{Country, QuadratError, Result};

/// Longest digit run a reference may carry (five eastings/northings pairs,
/// down to 1 m squares).
const MAX_DIGITS: usize = 10;

/// Ordinal of a grid letter in the 25-letter alphabet that omits I.
fn ordinal_no_i(reference: &str, letter: char) -> Result<u32> {
    match letter {
        'A'..='H' => Ok(letter as u32 - 'A' as u32),
        'I' => Err(QuadratError::malformed(
            reference,
            "grid letters never include I",
        )),
        'J'..='Z' => Ok(letter as u32 - 'A' as u32 - 1),
        _ => Err(QuadratError::malformed(
            reference,
            format!("'{}' is not a grid letter", letter),
        )),
    }
}

/// DINTY tetrad letter (A-Z omitting O) to its `x * 5 + y` cell index.
fn tetrad_index(reference: &str, letter: char) -> Result<usize> {
    match letter {
        'A'..='N' => Ok((letter as u32 - 'A' as u32) as usize),
        'O' => Err(QuadratError::malformed(
            reference,
            "tetrad letters never include O",
        )),
        'P'..='Z' => Ok((letter as u32 - 'A' as u32 - 1) as usize),
        _ => Err(QuadratError::malformed(
            reference,
            format!("'{}' is not a tetrad letter", letter),
        )),
    }
}

/// Resolves the 100 km cell coordinate for a GB two-letter prefix.
///
/// The first letter names a 500 km square of the 5x5 layout (A at the
/// north-west, I omitted), the second a 100 km square within it.
fn gb_cell(reference: &str, first: char, second: char) -> Result<(u32, u32)> {
    let l1 = ordinal_no_i(reference, first)? as i32;
    let l2 = ordinal_no_i(reference, second)? as i32;

    let e100 = (l1 - 2).rem_euclid(5) * 5 + l2.rem_euclid(5);
    let n100 = 19 - (l1 / 5) * 5 - (l2 / 5);
    bounded_cell(reference, Country::Gb, e100, n100)
}

/// Resolves the 100 km cell coordinate for an IE single-letter prefix.
fn ie_cell(reference: &str, letter: char) -> Result<(u32, u32)> {
    let l = ordinal_no_i(reference, letter)? as i32;
    let e100 = l.rem_euclid(5);
    let n100 = 4 - l / 5;
    bounded_cell(reference, Country::Ie, e100, n100)
}

/// Resolves the 100 km cell for a CI prefix: the scheme has exactly two
/// squares, WA (north) and WV (south).
fn ci_cell(reference: &str, first: char, second: char) -> Result<(u32, u32)> {
    match (first, second) {
        ('W', 'A') => Ok((0, 1)),
        ('W', 'V') => Ok((0, 0)),
        _ => Err(QuadratError::malformed(
            reference,
            format!("'{}{}' is not a Channel Islands square", first, second),
        )),
    }
}

fn bounded_cell(reference: &str, country: Country, e100: i32, n100: i32) -> Result<(u32, u32)> {
    if e100 < 0 || n100 < 0 || e100 >= country.grid_cols() as i32 || n100 >= country.grid_rows() as i32
    {
        return Err(QuadratError::malformed(
            reference,
            format!("100 km square lies outside the {} grid", country),
        ));
    }
    Ok((e100 as u32, n100 as u32))
}

/// Translates a grid reference into per-level cell indices.
///
/// Returns one index per precision level the reference encodes; callers
/// treat a path shorter than the precision they want as "cannot descend
/// further". Malformed references fail with `MalformedReference`.
pub fn grid_ref_path(reference: &str, country: Country) -> Result<Vec<usize>> {
    let trimmed = reference.trim().to_ascii_uppercase();
    let mut chars = trimmed.chars().peekable();

    let letters = match country {
        Country::Ie => 1,
        Country::Gb | Country::Ci => 2,
    };
    let mut prefix = ['\0'; 2];
    for slot in prefix.iter_mut().take(letters) {
        *slot = chars.next().ok_or_else(|| {
            QuadratError::malformed(reference, "reference shorter than its letter prefix")
        })?;
    }

    let (e100, n100) = match country {
        Country::Gb => gb_cell(reference, prefix[0], prefix[1])?,
        Country::Ie => ie_cell(reference, prefix[0])?,
        Country::Ci => ci_cell(reference, prefix[0], prefix[1])?,
    };
    let mut path = vec![(n100 * country.grid_cols() + e100) as usize];

    // Digit run, optionally followed by a single DINTY tetrad letter.
    let mut digits: Vec<u32> = Vec::new();
    while let Some(&c) = chars.peek() {
        match c.to_digit(10) {
            Some(d) => {
                digits.push(d);
                chars.next();
            }
            None => break,
        }
    }
    let tetrad_letter = chars.next();
    if chars.next().is_some() {
        return Err(QuadratError::malformed(
            reference,
            "trailing characters after the reference",
        ));
    }

    if digits.is_empty() {
        if tetrad_letter.is_some() {
            return Err(QuadratError::malformed(
                reference,
                "tetrad letter without hectad digits",
            ));
        }
        return Ok(path);
    }
    if digits.len() % 2 != 0 {
        return Err(QuadratError::malformed(reference, "odd number of digits"));
    }
    if digits.len() > MAX_DIGITS {
        return Err(QuadratError::malformed(
            reference,
            format!("more than {} digits", MAX_DIGITS),
        ));
    }
    if tetrad_letter.is_some() && digits.len() != 2 {
        return Err(QuadratError::malformed(
            reference,
            "tetrad letter only follows a hectad reference",
        ));
    }

    let pairs = digits.len() / 2;
    let eastings = &digits[..pairs];
    let northings = &digits[pairs..];

    // Hectad within the 100 km cell.
    path.push((eastings[0] * 10 + northings[0]) as usize);

    if let Some(letter) = tetrad_letter {
        path.push(tetrad_index(reference, letter)?);
        return Ok(path);
    }

    if pairs >= 2 {
        // Tetrad by integer-halved monad digits, then the monad's 2x2
        // position within it.
        let (x, y) = (eastings[1], northings[1]);
        path.push((x / 2 * 5 + y / 2) as usize);
        path.push((x % 2 * 2 + y % 2) as usize);
    }

    // 100 m, 10 m and 1 m levels are plain decimal subdivisions.
    for pair in 2..pairs {
        path.push((eastings[pair] * 10 + northings[pair]) as usize);
    }

    Ok(path)
}
