//! Fixed annotation text: the seed rows and the constant pair.

use chrono::{DateTime, Utc};

use crate::records::{NewAnalysisResponse, NewBirdDescription};

/// Species seeded into an empty `bird_descriptions` table.
pub const SEED_DESCRIPTIONS: &[(&str, &str)] = &[
    (
        "Northern Cardinal",
        "A medium-sized songbird with a short, thick red bill and a prominent crest. \
         Males are brilliant red all over with a black mask around the bill; females \
         are warm buff-brown with red tinges in the wings, tail and crest. Cardinals \
         do not migrate and are common at feeders across eastern North America.",
    ),
    (
        "Blue Jay",
        "A large, crested songbird with lavender-blue upperparts, a white face and \
         underparts, and a black necklace. Blue Jays are noisy and intelligent, known \
         for caching acorns and for mimicking the calls of hawks.",
    ),
    (
        "American Robin",
        "A large thrush with a gray-brown back and a warm orange breast. Robins are \
         often seen running across lawns and tugging earthworms from the ground, and \
         their caroling song is one of the first heard at dawn in spring.",
    ),
    (
        "Bald Eagle",
        "A very large raptor with a dark brown body and wings, a white head and tail, \
         and a heavy yellow bill. Bald Eagles are usually found near open water, where \
         they catch fish or steal them from other birds.",
    ),
    (
        "Ruby-throated Hummingbird",
        "A tiny, iridescent green hummingbird; adult males have a glittering ruby-red \
         throat. It beats its wings about fifty times a second, hovers at tubular \
         flowers and feeders, and migrates across the Gulf of Mexico each year.",
    ),
];

/// Analysis paragraphs seeded into an empty `responses` table.
pub const SEED_RESPONSES: &[&str] = &[
    "The bird is perched in good light and its plumage is clearly visible. Bill shape \
     and wing markings are consistent with a common backyard species; the posture \
     suggests it is resting rather than foraging.",
    "The image shows strong color contrast around the head and breast, which is the \
     most useful field mark here. The background vegetation suggests a woodland edge \
     habitat, typical for this kind of songbird.",
    "The subject is partly obscured, but the overall size, silhouette and tail length \
     narrow the identification considerably. A second photo from the side would help \
     confirm the species.",
];

/// Species name of the constant description.
pub const CONSTANT_BIRD_NAME: &str = "Northern Cardinal";

/// Text of the constant analysis.
pub const CONSTANT_RESPONSE: &str = "This appears to be a male Northern Cardinal, identified by its \
     bright red plumage, pointed crest and black face mask around a thick, cone-shaped bill.";

/// Description rows stamped with `seeded_at`.
#[must_use]
pub fn seed_descriptions(seeded_at: DateTime<Utc>) -> Vec<NewBirdDescription> {
    SEED_DESCRIPTIONS
        .iter()
        .map(|(bird_name, description)| NewBirdDescription {
            bird_name: (*bird_name).to_string(),
            description: (*description).to_string(),
            created_at: seeded_at,
        })
        .collect()
}

/// Response rows stamped with `seeded_at`.
#[must_use]
pub fn seed_responses(seeded_at: DateTime<Utc>) -> Vec<NewAnalysisResponse> {
    SEED_RESPONSES
        .iter()
        .map(|response| NewAnalysisResponse {
            response: (*response).to_string(),
            created_at: seeded_at,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_counts() {
        assert_eq!(SEED_DESCRIPTIONS.len(), 5);
        assert_eq!(SEED_RESPONSES.len(), 3);
    }

    #[test]
    fn test_seed_rows_share_timestamp() {
        let now = Utc::now();
        let rows = seed_descriptions(now);
        assert_eq!(rows.len(), 5);
        assert!(rows.iter().all(|r| r.created_at == now));
        assert!(seed_responses(now).iter().all(|r| r.created_at == now));
    }

    #[test]
    fn test_constant_species_is_seeded() {
        assert!(SEED_DESCRIPTIONS
            .iter()
            .any(|(name, _)| *name == CONSTANT_BIRD_NAME));
    }
}
