/// Workflow phases and photo grouping
///
/// Photos are presented in the order work happens on site. Each phase
/// claims a set of `photo_type` tags; whatever no phase claims ends up
/// in the uncategorised bucket.

use serde::{Deserialize, Serialize};

use super::data::Photo;

/// A named, ordered bucket of photo types
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct WorkflowPhase {
    pub id: String,
    pub label: String,
    pub photo_types: Vec<String>,
}

impl WorkflowPhase {
    fn new(id: &str, label: &str, photo_types: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            photo_types: photo_types.iter().map(|t| t.to_string()).collect(),
        }
    }

    pub fn claims(&self, photo_type: &str) -> bool {
        self.photo_types.iter().any(|t| t == photo_type)
    }
}

/// Built-in phase table used when the config does not override it
pub fn default_phases() -> Vec<WorkflowPhase> {
    vec![
        WorkflowPhase::new("before", "Before Work", &["before", "existing"]),
        WorkflowPhase::new(
            "during",
            "During Installation",
            &["during", "installation", "cable_route", "containment"],
        ),
        WorkflowPhase::new("testing", "Testing", &["testing", "test_results", "readings"]),
        WorkflowPhase::new("after", "Completed Work", &["after", "completion", "finished"]),
        WorkflowPhase::new("general", "General", &["general", "other"]),
    ]
}

/// One non-empty phase with its photos in input order
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseGroup<'a> {
    pub phase: &'a WorkflowPhase,
    pub photos: Vec<&'a Photo>,
}

/// Result of grouping a share's photos
#[derive(Debug, Clone, PartialEq)]
pub enum Grouping<'a> {
    /// No photo carries a type tag: show one grid in original order
    Flat,
    Phased {
        groups: Vec<PhaseGroup<'a>>,
        uncategorised: Vec<&'a Photo>,
    },
}

/// Partition photos into the given phases.
///
/// A photo without a type counts as "general". Phases nobody matched are
/// left out. If several phases claim the same tag the first one wins, so a
/// photo is never listed twice.
pub fn group_photos<'a>(photos: &'a [Photo], phases: &'a [WorkflowPhase]) -> Grouping<'a> {
    if photos.iter().all(|photo| photo.tagged_type().is_none()) {
        return Grouping::Flat;
    }

    let owner = |photo: &Photo| {
        phases
            .iter()
            .position(|phase| phase.claims(photo.effective_type()))
    };

    let groups = phases
        .iter()
        .enumerate()
        .filter_map(|(index, phase)| {
            let members: Vec<&Photo> = photos
                .iter()
                .filter(|&photo| owner(photo) == Some(index))
                .collect();
            (!members.is_empty()).then_some(PhaseGroup {
                phase,
                photos: members,
            })
        })
        .collect();

    let uncategorised = photos.iter().filter(|&photo| owner(photo).is_none()).collect();

    Grouping::Phased {
        groups,
        uncategorised,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::data::fixtures::photo;
    use proptest::prelude::*;
    use proptest::test_runner::Config;

    fn ids(photos: &[&Photo]) -> Vec<String> {
        photos.iter().map(|p| p.id.clone()).collect()
    }

    #[test]
    fn test_untyped_photos_fall_back_to_flat() {
        let photos = vec![photo("1", None), photo("2", None), photo("3", None)];
        assert_eq!(group_photos(&photos, &default_phases()), Grouping::Flat);
    }

    #[test]
    fn test_before_and_after_groups() {
        let photos = vec![
            photo("1", Some("after")),
            photo("2", Some("before")),
            photo("3", Some("after")),
        ];
        let phases = default_phases();

        let Grouping::Phased { groups, uncategorised } = group_photos(&photos, &phases) else {
            panic!("expected phased grouping");
        };

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].phase.id, "before");
        assert_eq!(ids(&groups[0].photos), vec!["2"]);
        assert_eq!(groups[1].phase.id, "after");
        assert_eq!(ids(&groups[1].photos), vec!["1", "3"]);
        assert!(uncategorised.is_empty());
    }

    #[test]
    fn test_untyped_photo_joins_general_phase() {
        let photos = vec![photo("1", Some("before")), photo("2", None)];
        let phases = default_phases();

        let Grouping::Phased { groups, .. } = group_photos(&photos, &phases) else {
            panic!("expected phased grouping");
        };

        let general = groups.iter().find(|g| g.phase.id == "general").unwrap();
        assert_eq!(ids(&general.photos), vec!["2"]);
    }

    #[test]
    fn test_unclaimed_types_are_uncategorised() {
        let photos = vec![
            photo("1", Some("drone")),
            photo("2", Some("before")),
            photo("3", Some("thermal")),
        ];
        let phases = default_phases();

        let Grouping::Phased { groups, uncategorised } = group_photos(&photos, &phases) else {
            panic!("expected phased grouping");
        };

        assert_eq!(groups.len(), 1);
        assert_eq!(ids(&uncategorised), vec!["1", "3"]);
    }

    #[test]
    fn test_untyped_without_general_phase_is_uncategorised() {
        let photos = vec![photo("1", Some("before")), photo("2", None)];
        let phases = vec![WorkflowPhase::new("before", "Before", &["before"])];

        let Grouping::Phased { uncategorised, .. } = group_photos(&photos, &phases) else {
            panic!("expected phased grouping");
        };

        assert_eq!(ids(&uncategorised), vec!["2"]);
    }

    #[test]
    fn test_blank_type_counts_as_untyped() {
        let blank = vec![photo("1", Some("")), photo("2", Some("  ")), photo("3", None)];
        assert_eq!(group_photos(&blank, &default_phases()), Grouping::Flat);

        let photos = vec![photo("1", Some("before")), photo("2", Some(""))];
        let phases = default_phases();
        let Grouping::Phased { groups, uncategorised } = group_photos(&photos, &phases) else {
            panic!("expected phased grouping");
        };

        let general = groups.iter().find(|g| g.phase.id == "general").unwrap();
        assert_eq!(ids(&general.photos), vec!["2"]);
        assert!(uncategorised.is_empty());
    }

    const TYPES: &[&str] = &["before", "during", "testing", "after", "general", "drone", "misc"];

    fn arb_photos() -> impl Strategy<Value = Vec<Photo>> {
        prop::collection::vec(prop::option::of(0..TYPES.len()), 0..24).prop_map(|types| {
            types
                .into_iter()
                .enumerate()
                .map(|(i, t)| photo(&i.to_string(), t.map(|t| TYPES[t])))
                .collect()
        })
    }

    fn flatten(grouping: &Grouping<'_>, photos: &[Photo]) -> Vec<String> {
        match grouping {
            Grouping::Flat => photos.iter().map(|p| p.id.clone()).collect(),
            Grouping::Phased { groups, uncategorised } => groups
                .iter()
                .flat_map(|g| g.photos.iter())
                .chain(uncategorised.iter())
                .map(|p| p.id.clone())
                .collect(),
        }
    }

    proptest! {
        #![proptest_config(Config::with_cases(128))]

        #[test]
        fn grouping_is_deterministic(photos in arb_photos(), seed in any::<u64>()) {
            let phases = default_phases();
            let first = flatten(&group_photos(&photos, &phases), &photos);

            // Shuffle, then restore the original order by index
            let mut shuffled: Vec<(usize, Photo)> = photos.iter().cloned().enumerate().collect();
            let len = shuffled.len().max(1);
            shuffled.rotate_left((seed as usize) % len);
            shuffled.sort_by_key(|(index, _)| *index);
            let restored: Vec<Photo> = shuffled.into_iter().map(|(_, p)| p).collect();

            let second = flatten(&group_photos(&restored, &phases), &restored);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn grouping_keeps_every_photo_once(photos in arb_photos()) {
            let phases = default_phases();
            let mut grouped = flatten(&group_photos(&photos, &phases), &photos);
            let mut input: Vec<String> = photos.iter().map(|p| p.id.clone()).collect();
            grouped.sort();
            input.sort();
            prop_assert_eq!(grouped, input);
        }
    }
}
