//! Unit tests for the kiln CRD types
//!
//! Covers the build decision (`Image::build_needed`), build construction
//! (`Image::next_build`), and the running/terminal classification of Builds.

#[cfg(test)]
mod image_build_decision {
    use std::collections::BTreeMap;

    use kube::api::ObjectMeta;

    use crate::crd::{
        Build, BuildPhase, BuildSpec, BuildStatus, Builder, BuilderSpec, Image, ImageSpec,
        ImageStatus, BUILD_NUMBER_LABEL, IMAGE_NAME_LABEL,
    };

    fn make_image(name: &str, generation: i64, counter: i64, last_build: Option<&str>) -> Image {
        Image {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("ns".to_string()),
                generation: Some(generation),
                uid: Some(format!("uid-{}", name)),
                ..Default::default()
            },
            spec: ImageSpec {
                tag: "registry.example.com/app".to_string(),
                builder_ref: "base-builder".to_string(),
                source: Default::default(),
            },
            status: Some(ImageStatus {
                build_counter: counter,
                last_build_ref: last_build.map(String::from),
                observed_generation: None,
                conditions: vec![],
            }),
        }
    }

    fn make_builder(name: &str, generation: i64) -> Builder {
        Builder {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("ns".to_string()),
                generation: Some(generation),
                ..Default::default()
            },
            spec: BuilderSpec {
                image: "builder.example.com/base:stack".to_string(),
            },
            status: None,
        }
    }

    fn make_build(
        name: &str,
        image_name: &str,
        number: i64,
        image_generation: i64,
        builder_generation: i64,
        phase: Option<BuildPhase>,
    ) -> Build {
        let mut labels = BTreeMap::new();
        labels.insert(BUILD_NUMBER_LABEL.to_string(), number.to_string());
        labels.insert(IMAGE_NAME_LABEL.to_string(), image_name.to_string());

        Build {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("ns".to_string()),
                labels: Some(labels),
                ..Default::default()
            },
            spec: BuildSpec {
                tag: "registry.example.com/app".to_string(),
                builder_image: "builder.example.com/base:stack".to_string(),
                source: Default::default(),
                image_generation,
                builder_generation,
            },
            status: phase.map(|phase| BuildStatus {
                phase,
                message: None,
            }),
        }
    }

    #[test]
    fn build_needed_when_no_current_build() {
        let image = make_image("app", 1, 0, None);
        let builder = make_builder("base-builder", 1);

        assert!(image.build_needed(None, &builder));
    }

    #[test]
    fn build_needed_when_image_generation_advanced() {
        let image = make_image("app", 3, 1, Some("app-build-1"));
        let builder = make_builder("base-builder", 1);
        let build = make_build("app-build-1", "app", 0, 2, 1, Some(BuildPhase::Succeeded));

        assert!(image.build_needed(Some(&build), &builder));
    }

    #[test]
    fn build_needed_when_builder_generation_advanced() {
        let image = make_image("app", 2, 1, Some("app-build-1"));
        let builder = make_builder("base-builder", 5);
        let build = make_build("app-build-1", "app", 0, 2, 4, Some(BuildPhase::Succeeded));

        assert!(image.build_needed(Some(&build), &builder));
    }

    #[test]
    fn no_build_needed_when_generations_match() {
        let image = make_image("app", 2, 1, Some("app-build-1"));
        let builder = make_builder("base-builder", 4);
        let build = make_build("app-build-1", "app", 0, 2, 4, Some(BuildPhase::Succeeded));

        assert!(!image.build_needed(Some(&build), &builder));
    }

    #[test]
    fn next_build_name_and_ordinal() {
        // Counter 1: existing build is ordinal 0, the next is ordinal 1 and
        // takes the name <image>-build-2
        let image = make_image("app", 2, 1, Some("app-build-1"));
        let builder = make_builder("base-builder", 1);

        let build = image.next_build(&builder);
        assert_eq!(build.metadata.name.as_deref(), Some("app-build-2"));
        assert_eq!(build.build_number(), Some(1));
        assert_eq!(
            build
                .metadata
                .labels
                .as_ref()
                .and_then(|l| l.get(IMAGE_NAME_LABEL))
                .map(String::as_str),
            Some("app")
        );
    }

    #[test]
    fn next_build_records_generation_anchors() {
        let image = make_image("app", 7, 0, None);
        let builder = make_builder("base-builder", 3);

        let build = image.next_build(&builder);
        assert_eq!(build.spec.image_generation, 7);
        assert_eq!(build.spec.builder_generation, 3);
        assert_eq!(build.spec.builder_image, builder.spec.image);
        assert_eq!(build.spec.tag, image.spec.tag);
    }

    #[test]
    fn next_build_is_owned_by_image() {
        let image = make_image("app", 1, 0, None);
        let builder = make_builder("base-builder", 1);

        let build = image.next_build(&builder);
        let owners = build.metadata.owner_references.expect("owner references");
        assert_eq!(owners.len(), 1);
        assert_eq!(owners[0].kind, "Image");
        assert_eq!(owners[0].name, "app");
        assert_eq!(owners[0].controller, Some(true));
    }

    #[test]
    fn build_without_status_counts_as_running() {
        let build = make_build("app-build-1", "app", 0, 1, 1, None);
        assert!(build.is_running());
    }

    #[test]
    fn build_running_phases() {
        for phase in [BuildPhase::Pending, BuildPhase::Running] {
            let build = make_build("app-build-1", "app", 0, 1, 1, Some(phase));
            assert!(build.is_running(), "{:?} should count as running", phase);
        }
        for phase in [BuildPhase::Succeeded, BuildPhase::Failed] {
            let build = make_build("app-build-1", "app", 0, 1, 1, Some(phase));
            assert!(!build.is_running(), "{:?} is terminal", phase);
        }
    }

    #[test]
    fn build_number_requires_well_formed_label() {
        let mut build = make_build("app-build-1", "app", 4, 1, 1, None);
        assert_eq!(build.build_number(), Some(4));

        build
            .metadata
            .labels
            .as_mut()
            .unwrap()
            .insert(BUILD_NUMBER_LABEL.to_string(), "not-a-number".to_string());
        assert_eq!(build.build_number(), None);

        build.metadata.labels = None;
        assert_eq!(build.build_number(), None);
    }

    #[test]
    fn build_counter_defaults_to_zero() {
        let mut image = make_image("app", 1, 3, None);
        assert_eq!(image.build_counter(), 3);

        image.status = None;
        assert_eq!(image.build_counter(), 0);
    }
}
