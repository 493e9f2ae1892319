//! Suitability questionnaire. Three questions, three options each, worth 0, 5 or 10
//! points. The total picks one of the three risk profiles.

use offshore_models::RiskProfileName;
use serde::{Deserialize, Serialize};

use crate::error::{Invalid, ResearchError};

/// Highest total that still maps to Conservative.
pub const CONSERVATIVE_MAX: u8 = 10;
/// Highest total that still maps to Moderate.
pub const MODERATE_MAX: u8 = 20;
/// Points added per step down the option list.
pub const POINTS_PER_STEP: u8 = 5;

pub struct Question {
    pub prompt: &'static str,
    pub options: [&'static str; 3],
}

/// Questions in asking order. Options are listed from the most cautious answer.
pub const QUESTIONS: [Question; 3] = [
    Question {
        prompt: "What is your main investment objective?",
        options: [
            "Preserve capital",
            "Balance growth and safety",
            "Maximise long-term growth",
        ],
    },
    Question {
        prompt: "How long do you plan to keep this money invested?",
        options: ["Less than 3 years", "Between 3 and 10 years", "More than 10 years"],
    },
    Question {
        prompt: "If global markets fell 20% in a month, what would you do?",
        options: [
            "Sell most of my assets",
            "Hold my positions, but worry",
            "Buy more, seeing an opportunity",
        ],
    },
];

macro_rules! answer_options {
    ($ty:ident, $question:literal, [$first:ident, $second:ident, $third:ident]) => {
        impl $ty {
            pub const ORDER: [$ty; 3] = [$ty::$first, $ty::$second, $ty::$third];

            /// Zero-based option position, as listed in [`QUESTIONS`].
            pub fn index(&self) -> usize {
                match self {
                    $ty::$first => 0,
                    $ty::$second => 1,
                    $ty::$third => 2,
                }
            }

            pub fn points(&self) -> u8 {
                self.index() as u8 * POINTS_PER_STEP
            }

            pub fn from_index(index: usize) -> Result<Self, ResearchError> {
                Self::ORDER.get(index).copied().ok_or_else(|| {
                    Invalid::OptionOutOfRange {
                        question: $question,
                        index,
                    }
                    .into()
                })
            }

            pub fn label(&self) -> &'static str {
                QUESTIONS[$question - 1].options[self.index()]
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Objective {
    #[default]
    PreserveCapital,
    Balanced,
    LongTermGrowth,
}

answer_options!(Objective, 1, [PreserveCapital, Balanced, LongTermGrowth]);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Horizon {
    #[default]
    UnderThreeYears,
    ThreeToTenYears,
    OverTenYears,
}

answer_options!(Horizon, 2, [UnderThreeYears, ThreeToTenYears, OverTenYears]);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DrawdownReaction {
    #[default]
    SellMost,
    HoldAndWorry,
    BuyMore,
}

answer_options!(DrawdownReaction, 3, [SellMost, HoldAndWorry, BuyMore]);

/// One complete set of answers. The default picks the first option everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Answers {
    pub objective: Objective,
    pub horizon: Horizon,
    pub drawdown: DrawdownReaction,
}

impl Answers {
    /// Build answers from zero-based option indices, in question order.
    pub fn from_indices(indices: [usize; 3]) -> Result<Self, ResearchError> {
        Ok(Self {
            objective: Objective::from_index(indices[0])?,
            horizon: Horizon::from_index(indices[1])?,
            drawdown: DrawdownReaction::from_index(indices[2])?,
        })
    }

    pub fn points(&self) -> u8 {
        self.objective.points() + self.horizon.points() + self.drawdown.points()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RiskAssessment {
    pub points: u8,
    pub profile: RiskProfileName,
}

pub fn profile_for_points(points: u8) -> RiskProfileName {
    if points <= CONSERVATIVE_MAX {
        RiskProfileName::Conservative
    } else if points <= MODERATE_MAX {
        RiskProfileName::Moderate
    } else {
        RiskProfileName::Aggressive
    }
}

pub fn score(answers: &Answers) -> RiskAssessment {
    let points = answers.points();
    RiskAssessment {
        points,
        profile: profile_for_points(points),
    }
}
