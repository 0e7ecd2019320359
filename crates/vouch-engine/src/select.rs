//! Descriptor selection by submission requirement.

use vouch_core::{InputDescriptor, PresentationDefinition, SubmissionRequirement};

/// Descriptors whose group contains the requirement's label, recursing into
/// nested requirements. Branches are concatenated without de-duplication.
pub fn select<'a>(
    definition: &'a PresentationDefinition,
    requirement: &SubmissionRequirement,
) -> Vec<&'a InputDescriptor> {
    match requirement {
        SubmissionRequirement::From { group, .. } => definition
            .input_descriptors
            .iter()
            .filter(|d| d.group.contains(group))
            .collect(),
        SubmissionRequirement::FromNested { requirements, .. } => requirements
            .iter()
            .flat_map(|r| select(definition, r))
            .collect(),
    }
}

/// One evaluation branch: every descriptor in it has to pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch<'a> {
    /// Index of the top-level requirement the branch belongs to.
    pub requirement: usize,
    pub name: Option<String>,
    /// Whether sibling branches of the same requirement can satisfy it instead.
    pub alternative: bool,
    pub descriptors: Vec<&'a InputDescriptor>,
}

/// Flatten a definition into evaluation branches.
///
/// Each top-level `from` requirement is one mandatory branch. The
/// sub-requirements of a top-level `from_nested` are alternative branches of
/// that requirement. Without submission requirements every descriptor
/// lands in one branch.
pub fn branches(definition: &PresentationDefinition) -> Vec<Branch<'_>> {
    let Some(requirements) = &definition.submission_requirements else {
        return vec![Branch {
            requirement: 0,
            name: None,
            alternative: false,
            descriptors: definition.input_descriptors.iter().collect(),
        }];
    };

    let mut out = Vec::new();
    for (index, requirement) in requirements.iter().enumerate() {
        match requirement {
            SubmissionRequirement::From { name, .. } => out.push(Branch {
                requirement: index,
                name: name.clone(),
                alternative: false,
                descriptors: select(definition, requirement),
            }),
            SubmissionRequirement::FromNested { requirements: subs, .. } => {
                for sub in subs {
                    out.push(Branch {
                        requirement: index,
                        name: sub.name().or(requirement.name()).map(str::to_string),
                        alternative: true,
                        descriptors: select(definition, sub),
                    });
                }
            }
        }
    }
    out
}

/// Every descriptor some branch refers to, once, in definition order.
pub fn eligible(definition: &PresentationDefinition) -> Vec<&InputDescriptor> {
    let selected = branches(definition);
    definition
        .input_descriptors
        .iter()
        .filter(|d| {
            selected
                .iter()
                .any(|b| b.descriptors.iter().any(|s| s.name == d.name))
        })
        .collect()
}
