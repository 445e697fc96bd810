//! Entity and relationship type definitions.
//!
//! Adapted from the teacher's `EntityType`/`RelationshipType`: same
//! `from_str_flexible`/`Display`/`FromStr`/`all()` idiom, now over the
//! closed sets this knowledge graph actually models instead of the
//! teacher's smaller person/org/location/project/concept/event/category set.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Entity types that can be extracted from text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Person,
    Organization,
    Location,
    Product,
    Technology,
    Concept,
    Event,
    Other,
}

impl EntityType {
    /// Parse entity type from a string with flexible matching, tolerating
    /// casing and common synonyms a statistical extractor might emit.
    pub fn from_str_flexible(s: &str) -> Option<Self> {
        let normalized = s.trim().to_lowercase();

        match normalized.as_str() {
            "person" | "per" | "people" | "individual" | "human" | "user" => Some(Self::Person),
            "organization" | "org" | "organisation" | "company" | "corporation" | "institution"
            | "business" | "firm" | "agency" => Some(Self::Organization),
            "location" | "loc" | "place" | "address" | "city" | "country" | "region" | "area"
            | "venue" | "site" => Some(Self::Location),
            "product" | "prod" | "item" | "offering" | "service" => Some(Self::Product),
            "technology" | "tech" | "tool" | "framework" | "language" | "library" | "platform" => {
                Some(Self::Technology)
            }
            "concept" | "idea" | "topic" | "theme" | "notion" | "theory" | "subject" | "field"
            | "discipline" => Some(Self::Concept),
            "event" | "evt" | "meeting" | "conference" | "occasion" | "happening" | "occurrence"
            | "activity" => Some(Self::Event),
            "other" | "misc" | "miscellaneous" | "unknown" => Some(Self::Other),
            _ => None,
        }
    }

    pub fn all() -> &'static [EntityType] {
        &[
            Self::Person,
            Self::Organization,
            Self::Location,
            Self::Product,
            Self::Technology,
            Self::Concept,
            Self::Event,
            Self::Other,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::Organization => "organization",
            Self::Location => "location",
            Self::Product => "product",
            Self::Technology => "technology",
            Self::Concept => "concept",
            Self::Event => "event",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_flexible(s).ok_or_else(|| format!("unknown entity type: {}", s))
    }
}

/// Relationship types between entities. Chosen by pattern rules in
/// `StatisticalExtractor`/`RegexExtractor`, defaulting to `RelatesTo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    RelatesTo,
    Mentions,
    CausedBy,
    PartOf,
    WorksWith,
    LocatedIn,
    CreatedBy,
    UsedBy,
    SimilarTo,
    Precedes,
    Follows,
    WorksAt,
    Develops,
    Leads,
    Uses,
    AffiliatedWith,
    InvestsIn,
    CompetesWith,
    Owns,
}

impl RelationshipType {
    /// Parse relationship type from a string, normalizing separators and case.
    pub fn from_str_flexible(s: &str) -> Option<Self> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");

        match normalized.as_str() {
            "relates_to" | "relatedto" | "related_to" | "associated_with" | "linked_to" | "tied_to" => {
                Some(Self::RelatesTo)
            }
            "mentions" | "mentioned_in" | "references" | "cites" => Some(Self::Mentions),
            "caused_by" | "causedby" | "resulted_from" | "triggered_by" => Some(Self::CausedBy),
            "part_of" | "partof" | "belongs_to" | "component_of" | "subset_of" | "included_in" => {
                Some(Self::PartOf)
            }
            "works_with" | "worksWith" | "collaborates_with" | "partners_with" => Some(Self::WorksWith),
            "located_in" | "locatedin" | "situated_in" | "found_in" | "based_in" | "headquartered_in" => {
                Some(Self::LocatedIn)
            }
            "created_by" | "createdby" | "made_by" | "authored_by" | "built_by" | "founded_by"
            | "invented_by" => Some(Self::CreatedBy),
            "used_by" | "usedby" | "adopted_by" | "employed_by" => Some(Self::UsedBy),
            "similar_to" | "similarto" | "comparable_to" | "resembles" => Some(Self::SimilarTo),
            "precedes" | "before" | "comes_before" => Some(Self::Precedes),
            "follows" | "after" | "comes_after" | "succeeds" => Some(Self::Follows),
            "works_at" | "worksat" | "employee_of" | "works_for" | "employed_at" | "member_of" => {
                Some(Self::WorksAt)
            }
            "develops" | "builds" | "maintains" | "authors" => Some(Self::Develops),
            "leads" | "manages" | "heads" | "directs" => Some(Self::Leads),
            "uses" | "utilizes" | "integrates_with" | "relies_on" => Some(Self::Uses),
            "affiliated_with" | "affiliatedwith" | "associated_to" => Some(Self::AffiliatedWith),
            "invests_in" | "investsin" | "funds" | "backs" => Some(Self::InvestsIn),
            "competes_with" | "competeswith" | "rivals" => Some(Self::CompetesWith),
            "owns" | "possesses" | "holds" => Some(Self::Owns),
            _ => None,
        }
    }

    pub fn all() -> &'static [RelationshipType] {
        &[
            Self::RelatesTo,
            Self::Mentions,
            Self::CausedBy,
            Self::PartOf,
            Self::WorksWith,
            Self::LocatedIn,
            Self::CreatedBy,
            Self::UsedBy,
            Self::SimilarTo,
            Self::Precedes,
            Self::Follows,
            Self::WorksAt,
            Self::Develops,
            Self::Leads,
            Self::Uses,
            Self::AffiliatedWith,
            Self::InvestsIn,
            Self::CompetesWith,
            Self::Owns,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RelatesTo => "relates_to",
            Self::Mentions => "mentions",
            Self::CausedBy => "caused_by",
            Self::PartOf => "part_of",
            Self::WorksWith => "works_with",
            Self::LocatedIn => "located_in",
            Self::CreatedBy => "created_by",
            Self::UsedBy => "used_by",
            Self::SimilarTo => "similar_to",
            Self::Precedes => "precedes",
            Self::Follows => "follows",
            Self::WorksAt => "works_at",
            Self::Develops => "develops",
            Self::Leads => "leads",
            Self::Uses => "uses",
            Self::AffiliatedWith => "affiliated_with",
            Self::InvestsIn => "invests_in",
            Self::CompetesWith => "competes_with",
            Self::Owns => "owns",
        }
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RelationshipType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_flexible(s).ok_or_else(|| format!("unknown relationship type: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_type_from_str_flexible_handles_synonyms() {
        assert_eq!(EntityType::from_str_flexible("PERSON"), Some(EntityType::Person));
        assert_eq!(EntityType::from_str_flexible("company"), Some(EntityType::Organization));
        assert_eq!(EntityType::from_str_flexible("framework"), Some(EntityType::Technology));
        assert_eq!(EntityType::from_str_flexible("  place  "), Some(EntityType::Location));
        assert_eq!(EntityType::from_str_flexible("unknown_garbage"), None);
    }

    #[test]
    fn relationship_type_from_str_flexible_handles_synonyms() {
        assert_eq!(RelationshipType::from_str_flexible("works at"), Some(RelationshipType::WorksAt));
        assert_eq!(RelationshipType::from_str_flexible("integrates-with"), Some(RelationshipType::Uses));
        assert_eq!(RelationshipType::from_str_flexible("FOUNDED_BY"), Some(RelationshipType::CreatedBy));
        assert_eq!(RelationshipType::from_str_flexible("nonsense"), None);
    }

    #[test]
    fn display_and_parse_round_trip() {
        for t in EntityType::all() {
            assert_eq!(EntityType::from_str(&t.to_string()).unwrap(), *t);
        }
        for t in RelationshipType::all() {
            assert_eq!(RelationshipType::from_str(&t.to_string()).unwrap(), *t);
        }
    }

    #[test]
    fn closed_sets_have_expected_sizes() {
        assert_eq!(EntityType::all().len(), 8);
        assert_eq!(RelationshipType::all().len(), 19);
    }

    #[test]
    fn serde_uses_snake_case() {
        assert_eq!(serde_json::to_string(&EntityType::Technology).unwrap(), "\"technology\"");
        assert_eq!(serde_json::to_string(&RelationshipType::InvestsIn).unwrap(), "\"invests_in\"");
    }
}
