use rand::Rng;

/// Upper bound on generated identifier length, in characters.
pub const MAX_ID_LENGTH: usize = 36;

const ID_BLOCK: &str = "xxxxxxxxxxxx";
const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Produces a collision-resistant workspace name.
///
/// Without a seed the name is two random hex blocks joined by `-`. With a
/// seed it is the seed, truncated so the whole name fits in
/// [`MAX_ID_LENGTH`], followed by `-` and one random block. An empty seed
/// counts as no seed.
pub fn new_id(seed: Option<&str>) -> String {
    let mut rng = rand::thread_rng();
    match seed.filter(|seed| !seed.is_empty()) {
        Some(seed) => {
            let budget = MAX_ID_LENGTH - (ID_BLOCK.len() + 1);
            let prefix: String = seed.chars().take(budget).collect();
            format!("{prefix}-{}", fill_template(ID_BLOCK, &mut rng))
        }
        None => format!(
            "{}-{}",
            fill_template(ID_BLOCK, &mut rng),
            fill_template(ID_BLOCK, &mut rng)
        ),
    }
}

/// RFC 4122 v4 style substitution: `x` is any hex digit, `y` is one of
/// `8`, `9`, `a`, `b`.
fn fill_template<R: Rng + ?Sized>(template: &str, rng: &mut R) -> String {
    template
        .chars()
        .map(|ch| match ch {
            'x' => hex_digit(rng.gen_range(0..16)),
            'y' => hex_digit((rng.gen_range(0..16) & 0x3) | 0x8),
            other => other,
        })
        .collect()
}

fn hex_digit(value: usize) -> char {
    HEX_DIGITS[value & 0xf] as char
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn is_hex_block(block: &str) -> bool {
        block.len() == ID_BLOCK.len() && block.chars().all(|ch| ch.is_ascii_hexdigit())
    }

    #[test]
    fn unseeded_ids_are_two_blocks() {
        let id = new_id(None);
        let (head, tail) = id.split_once('-').expect("hyphen");
        assert!(is_hex_block(head));
        assert!(is_hex_block(tail));
        assert_eq!(id.len(), 25);
    }

    #[test]
    fn seeded_ids_keep_prefix() {
        let id = new_id(Some("myjob"));
        assert!(id.starts_with("myjob-"));
        assert!(is_hex_block(&id["myjob-".len()..]));
    }

    #[test]
    fn long_seeds_are_truncated_to_fit() {
        let seed = "a-very-long-job-name-that-keeps-going";
        let id = new_id(Some(seed));
        assert_eq!(id.chars().count(), MAX_ID_LENGTH);
        assert!(id.starts_with(&seed[..23]));
        assert!(is_hex_block(&id[24..]));
    }

    #[test]
    fn empty_seed_is_ignored() {
        let id = new_id(Some(""));
        assert_eq!(id.len(), 25);
    }

    #[test]
    fn ten_thousand_ids_do_not_collide() {
        let ids: HashSet<String> = (0..10_000).map(|_| new_id(None)).collect();
        assert_eq!(ids.len(), 10_000);
        assert!(ids.iter().all(|id| id.chars().count() <= MAX_ID_LENGTH));
    }

    #[test]
    fn y_positions_use_variant_digits() {
        let mut rng = rand::thread_rng();
        for _ in 0..64 {
            let out = fill_template("y", &mut rng);
            assert!(matches!(out.as_str(), "8" | "9" | "a" | "b"));
        }
        assert_eq!(fill_template("-", &mut rng), "-");
    }
}
