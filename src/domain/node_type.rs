//! Closed catalogue of node types: trainings, mini-trainings, groups and the
//! learning unit leaf.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

macro_rules! named_types {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $label:literal,)+ }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $($variant,)+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            pub fn name(&self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }

            fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($label => Some($name::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

named_types!(
    /// Training (program) types.
    TrainingType {
        Aggregation => "AGGREGATION",
        Bachelor => "BACHELOR",
        Capaes => "CAPAES",
        Certificate => "CERTIFICATE",
        ResearchCertificate => "RESEARCH_CERTIFICATE",
        AccessContest => "ACCESS_CONTEST",
        Phd => "PHD",
        FormationPhd => "FORMATION_PHD",
        PgrmMaster120 => "PGRM_MASTER_120",
        MasterMa120 => "MASTER_MA_120",
        MasterMd120 => "MASTER_MD_120",
        MasterMs120 => "MASTER_MS_120",
        PgrmMaster180240 => "PGRM_MASTER_180_240",
        MasterMa180240 => "MASTER_MA_180_240",
        MasterMd180240 => "MASTER_MD_180_240",
        MasterMs180240 => "MASTER_MS_180_240",
        MasterM1 => "MASTER_M1",
        MasterMc => "MASTER_MC",
    }
);

named_types!(
    /// Mini-training types.
    MiniTrainingType {
        Deepening => "DEEPENING",
        SocietyMinor => "SOCIETY_MINOR",
        AccessMinor => "ACCESS_MINOR",
        OpenMinor => "OPEN_MINOR",
        DisciplinaryComplementMinor => "DISCIPLINARY_COMPLEMENT_MINOR",
        FsaSpeciality => "FSA_SPECIALITY",
        Option => "OPTION",
        MobilityPartnership => "MOBILITY_PARTNERSHIP",
    }
);

named_types!(
    /// Group types.
    GroupType {
        CommonCore => "COMMON_CORE",
        MinorListChoice => "MINOR_LIST_CHOICE",
        MajorListChoice => "MAJOR_LIST_CHOICE",
        OptionListChoice => "OPTION_LIST_CHOICE",
        Finality120ListChoice => "FINALITY_120_LIST_CHOICE",
        Finality180ListChoice => "FINALITY_180_LIST_CHOICE",
        MobilityPartnershipListChoice => "MOBILITY_PARTNERSHIP_LIST_CHOICE",
        ComplementaryModule => "COMPLEMENTARY_MODULE",
        SubGroup => "SUB_GROUP",
    }
);

impl TrainingType {
    pub fn is_finality(&self) -> bool {
        matches!(
            self,
            TrainingType::MasterMa120
                | TrainingType::MasterMd120
                | TrainingType::MasterMs120
                | TrainingType::MasterMa180240
                | TrainingType::MasterMd180240
                | TrainingType::MasterMs180240
        )
    }

    pub fn is_master_2m(&self) -> bool {
        matches!(
            self,
            TrainingType::PgrmMaster120 | TrainingType::PgrmMaster180240
        )
    }
}

impl MiniTrainingType {
    pub fn is_minor(&self) -> bool {
        matches!(
            self,
            MiniTrainingType::SocietyMinor
                | MiniTrainingType::AccessMinor
                | MiniTrainingType::OpenMinor
                | MiniTrainingType::DisciplinaryComplementMinor
        )
    }
}

impl GroupType {
    pub fn is_minor_major_list_choice(&self) -> bool {
        matches!(self, GroupType::MinorListChoice | GroupType::MajorListChoice)
    }
}

/// Type tag of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum NodeType {
    Training(TrainingType),
    MiniTraining(MiniTrainingType),
    Group(GroupType),
    LearningUnit,
}

const LEARNING_UNIT: &str = "LEARNING_UNIT";

impl NodeType {
    pub fn name(&self) -> &'static str {
        match self {
            NodeType::Training(t) => t.name(),
            NodeType::MiniTraining(t) => t.name(),
            NodeType::Group(t) => t.name(),
            NodeType::LearningUnit => LEARNING_UNIT,
        }
    }

    pub fn is_learning_unit(&self) -> bool {
        matches!(self, NodeType::LearningUnit)
    }

    pub fn is_group(&self) -> bool {
        matches!(self, NodeType::Group(_))
    }

    pub fn is_training(&self) -> bool {
        matches!(self, NodeType::Training(_))
    }

    pub fn is_mini_training(&self) -> bool {
        matches!(self, NodeType::MiniTraining(_))
    }

    pub fn is_finality(&self) -> bool {
        matches!(self, NodeType::Training(t) if t.is_finality())
    }

    pub fn is_master_2m(&self) -> bool {
        matches!(self, NodeType::Training(t) if t.is_master_2m())
    }

    pub fn is_option(&self) -> bool {
        matches!(self, NodeType::MiniTraining(MiniTrainingType::Option))
    }

    pub fn is_minor_major_list_choice(&self) -> bool {
        matches!(self, NodeType::Group(t) if t.is_minor_major_list_choice())
    }

    /// Mini-trainings that may only hang below a minor/major list choice by reference.
    pub fn is_minor_or_deepening(&self) -> bool {
        matches!(
            self,
            NodeType::MiniTraining(t)
                if t.is_minor()
                    || *t == MiniTrainingType::FsaSpeciality
                    || *t == MiniTrainingType::Deepening
        )
    }

    /// Every type of the catalogue.
    pub fn all() -> Vec<NodeType> {
        TrainingType::ALL
            .iter()
            .map(|t| NodeType::Training(*t))
            .chain(MiniTrainingType::ALL.iter().map(|t| NodeType::MiniTraining(*t)))
            .chain(GroupType::ALL.iter().map(|t| NodeType::Group(*t)))
            .chain(std::iter::once(NodeType::LearningUnit))
            .collect()
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Unknown node type name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown node type: {0}")]
pub struct UnknownNodeType(pub String);

impl FromStr for NodeType {
    type Err = UnknownNodeType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_uppercase();
        if name == LEARNING_UNIT {
            return Ok(NodeType::LearningUnit);
        }
        TrainingType::from_name(&name)
            .map(NodeType::Training)
            .or_else(|| MiniTrainingType::from_name(&name).map(NodeType::MiniTraining))
            .or_else(|| GroupType::from_name(&name).map(NodeType::Group))
            .ok_or(UnknownNodeType(s.to_string()))
    }
}

impl TryFrom<String> for NodeType {
    type Error = UnknownNodeType;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NodeType> for String {
    fn from(value: NodeType) -> Self {
        value.name().to_string()
    }
}

impl From<TrainingType> for NodeType {
    fn from(value: TrainingType) -> Self {
        NodeType::Training(value)
    }
}

impl From<MiniTrainingType> for NodeType {
    fn from(value: MiniTrainingType) -> Self {
        NodeType::MiniTraining(value)
    }
}

impl From<GroupType> for NodeType {
    fn from(value: GroupType) -> Self {
        NodeType::Group(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_every_type_when_name_parsed_back_then_same_type() {
        for node_type in NodeType::all() {
            assert_eq!(node_type.name().parse::<NodeType>(), Ok(node_type));
        }
    }

    #[test]
    fn given_lowercase_name_when_parsed_then_accepted() {
        assert_eq!(
            "common_core".parse::<NodeType>(),
            Ok(NodeType::Group(GroupType::CommonCore))
        );
    }

    #[test]
    fn given_unknown_name_when_parsed_then_error() {
        assert!("NOT_A_TYPE".parse::<NodeType>().is_err());
    }

    #[test]
    fn given_master_types_when_classified_then_finality_and_2m_are_disjoint() {
        let finality = NodeType::Training(TrainingType::MasterMa120);
        let program = NodeType::Training(TrainingType::PgrmMaster120);
        assert!(finality.is_finality() && !finality.is_master_2m());
        assert!(program.is_master_2m() && !program.is_finality());
    }
}
