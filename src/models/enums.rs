//! Closed status domains shared by the models.
//!
//! Every enum is stored as TEXT in PostgreSQL and serialized with the same
//! label in JSON. Parsing is case-insensitive so legacy rows written with a
//! different casing still load.

use serde::{Deserialize, Serialize};
use sqlx::Postgres;
use utoipa::ToSchema;

macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $label:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
        pub enum $name {
            $(
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                $(
                    if s.eq_ignore_ascii_case($label) {
                        return Ok($name::$variant);
                    }
                )+
                Err(format!("Invalid {} value: {}", stringify!($name), s))
            }
        }

        impl sqlx::Type<Postgres> for $name {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <String as sqlx::Type<Postgres>>::type_info()
            }

            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <String as sqlx::Type<Postgres>>::compatible(ty)
            }
        }

        impl<'r> sqlx::Decode<'r, Postgres> for $name {
            fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
                let s = <&str as sqlx::Decode<Postgres>>::decode(value)?;
                s.parse().map_err(|e: String| e.into())
            }
        }

        impl sqlx::Encode<'_, Postgres> for $name {
            fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
                <&str as sqlx::Encode<Postgres>>::encode(self.as_str(), buf)
            }
        }
    };
}

text_enum! {
    /// Backend role names
    Role {
        Admin => "ADMIN",
        StaffStation => "STAFF_STATION",
        Customer => "CUSTOMER",
    }
}

/// Roles that go through the OTP step at login
const PRIVILEGED_ROLES: &[&str] = &["ADMIN", "STAFF_STATION"];

impl Role {
    /// Role token understood by the web client
    pub fn client_token(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::StaffStation => "STAFF",
            Role::Customer => "RENTER",
        }
    }

    pub fn is_privileged(&self) -> bool {
        PRIVILEGED_ROLES
            .iter()
            .any(|name| name.eq_ignore_ascii_case(self.as_str()))
    }

    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Admin | Role::StaffStation)
    }
}

text_enum! {
    UserStatus {
        Active => "Active",
        Blocked => "Blocked",
    }
}

text_enum! {
    VehicleStatus {
        Available => "Available",
        Reserved => "Reserved",
        Rented => "Rented",
        Maintenance => "Maintenance",
    }
}

text_enum! {
    /// Rental lifecycle, see `RentalStatus::can_transition_to`
    RentalStatus {
        Booking => "Booking",
        Paid => "Paid",
        InProgress => "InProgress",
        Completed => "Completed",
        Cancelled => "Cancelled",
    }
}

text_enum! {
    DepositStatus {
        Held => "Held",
        Refunded => "Refunded",
    }
}

text_enum! {
    PenaltyStatus {
        Pending => "Pending",
        OffsetFromDeposit => "OffsetFromDeposit",
        Settled => "Settled",
    }
}

text_enum! {
    PaymentMethod {
        Cash => "Cash",
        BankTransfer => "BankTransfer",
        Card => "Card",
        PayOs => "PayOS",
        VnPay => "VNPay",
        Deposit => "Deposit",
    }
}

text_enum! {
    PaymentStatus {
        Completed => "Completed",
        Refunded => "Refunded",
    }
}

text_enum! {
    ContractStatus {
        Draft => "Draft",
        Signed => "Signed",
    }
}
