//! Branch and employee models.

use serde::{Deserialize, Serialize};

/// A physical clinic location; the scoping unit for staff and bookings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Branch {
    pub id: i64,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
}

impl Branch {
    pub fn new(name: String) -> Self {
        Self {
            id: 0,
            name,
            address: None,
            phone: None,
        }
    }
}

/// Canonical staff position.
///
/// The backend classifies staff with a numeric `positionId`; the mapping to
/// this enum happens once, in [`crate::wire`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Position {
    Admin,
    Veterinarian,
    Reception,
    Sales,
    Other,
}

impl Position {
    pub fn as_str(&self) -> &'static str {
        match self {
            Position::Admin => "admin",
            Position::Veterinarian => "veterinarian",
            Position::Reception => "reception",
            Position::Sales => "sales",
            Position::Other => "other",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "admin" | "manager" | "quản lý" => Some(Position::Admin),
            "veterinarian" | "vet" | "doctor" | "bác sĩ" => Some(Position::Veterinarian),
            "reception" | "receptionist" | "lễ tân" => Some(Position::Reception),
            "sales" | "seller" | "bán hàng" => Some(Position::Sales),
            "other" => Some(Position::Other),
            _ => None,
        }
    }

    /// Backend `positionId` classifier.
    pub fn from_position_id(position_id: i64) -> Self {
        match position_id {
            1 => Position::Admin,
            2 => Position::Veterinarian,
            3 => Position::Reception,
            4 => Position::Sales,
            _ => Position::Other,
        }
    }
}

/// A staff member, assigned to exactly one branch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Employee {
    pub id: i64,
    pub branch_id: i64,
    pub full_name: String,
    pub position: Position,
    /// Staff code, e.g. "BS001"
    pub code: Option<String>,
}

impl Employee {
    pub fn new(branch_id: i64, full_name: String, position: Position) -> Self {
        Self {
            id: 0,
            branch_id,
            full_name,
            position,
            code: None,
        }
    }

    pub fn is_doctor(&self) -> bool {
        self.position == Position::Veterinarian
    }

    /// Reception staff and admins may check customers in.
    pub fn can_check_in(&self) -> bool {
        matches!(self.position, Position::Reception | Position::Admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_round_trip_names() {
        for position in [
            Position::Admin,
            Position::Veterinarian,
            Position::Reception,
            Position::Sales,
            Position::Other,
        ] {
            assert_eq!(Position::parse(position.as_str()), Some(position));
        }
        assert_eq!(Position::parse("Bác sĩ"), Some(Position::Veterinarian));
        assert_eq!(Position::parse("janitor"), None);
    }

    #[test]
    fn test_check_in_permission() {
        let reception = Employee::new(1, "Lan".into(), Position::Reception);
        let vet = Employee::new(1, "Dr. Minh".into(), Position::Veterinarian);
        assert!(reception.can_check_in());
        assert!(!vet.can_check_in());
        assert!(vet.is_doctor());
    }
}
