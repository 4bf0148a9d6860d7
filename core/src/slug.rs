//! URL slugs for cars.
//!
//! A car slug is its name transliterated to ASCII and lower-cased, with
//! runs of non-alphanumerics collapsed to `-`, followed by a random three-digit suffix:
//! `"Toyota Avanza G"` → `toyota-avanza-g-417`. Renaming a car keeps the
//! suffix so links stay recognisable.

use deunicode::deunicode;
use rand::Rng;

/// Transliterate `name` to ASCII, lower-case it and join its alphanumeric
/// runs with `-`.
#[must_use]
pub fn slugify(name: &str) -> String {
    let ascii = deunicode(name);
    let mut slug = String::with_capacity(ascii.len());
    let mut pending_dash = false;
    for c in ascii.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// Slug for a car name with the given suffix.
#[must_use]
pub fn car_slug(name: &str, suffix: u16) -> String {
    let base = slugify(name);
    if base.is_empty() {
        format!("car-{suffix}")
    } else {
        format!("{base}-{suffix}")
    }
}

/// Random suffix in `100..=999`.
pub fn random_suffix<R: Rng + ?Sized>(rng: &mut R) -> u16 {
    rng.gen_range(100..=999)
}

/// Split a slug into its base and numeric suffix, if it has one.
#[must_use]
pub fn split_suffix(slug: &str) -> Option<(&str, u16)> {
    let (base, suffix) = slug.rsplit_once('-')?;
    if suffix.len() != 3 {
        return None;
    }
    suffix.parse().ok().map(|n| (base, n))
}

/// Slug for a renamed car. Keeps the old suffix when there is one.
pub fn rename_slug<R: Rng + ?Sized>(old_slug: &str, new_name: &str, rng: &mut R) -> String {
    let suffix = split_suffix(old_slug).map_or_else(|| random_suffix(rng), |(_, n)| n);
    car_slug(new_name, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("Toyota Avanza G"), "toyota-avanza-g");
        assert_eq!(slugify("  Honda -- HR-V  1.5 "), "honda-hr-v-1-5");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn slugify_transliterates_to_ascii() {
        let slug = slugify("Citroën Ë-C4 Straße");
        assert_eq!(slug, "citroen-e-c4-strasse");
        assert!(slug.is_ascii());
        assert_eq!(slugify("Škoda Octavia"), "skoda-octavia");
        assert!(slugify("日産 セレナ").is_ascii());
    }

    #[test]
    fn random_suffix_is_three_digits() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let n = random_suffix(&mut rng);
            assert!((100..=999).contains(&n));
        }
    }

    #[test]
    fn rename_keeps_suffix() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(rename_slug("toyota-avanza-417", "Toyota Veloz", &mut rng), "toyota-veloz-417");
        assert_eq!(split_suffix("brio"), None);
        assert_eq!(split_suffix("brio-2024x"), None);
    }

    #[test]
    fn empty_names_still_slug() {
        assert_eq!(car_slug("???", 123), "car-123");
    }
}
