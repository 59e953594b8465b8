use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "bookings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub booking_code: String,
    pub user_id: Option<Uuid>,
    pub trip_id: Uuid,
    pub company_id: Uuid,
    pub passenger_name: String,
    pub passenger_phone: String,
    pub passenger_email: Option<String>,
    pub total_price: i64,
    pub discount_amount: i64,
    pub voucher_id: Option<Uuid>,
    pub payment_method: String,
    pub payment_status: String,
    pub status: String,
    /// Denormalized seat-number list for receipts; booking_items is the
    /// source of truth for conflict checks.
    pub seats_display: String,
    pub notes: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::trips::Entity",
        from = "Column::TripId",
        to = "super::trips::Column::Id"
    )]
    Trips,
    #[sea_orm(has_many = "super::booking_items::Entity")]
    BookingItems,
    #[sea_orm(has_many = "super::payments::Entity")]
    Payments,
}

impl Related<super::trips::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Trips.def()
    }
}

impl Related<super::booking_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BookingItems.def()
    }
}

impl Related<super::payments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
