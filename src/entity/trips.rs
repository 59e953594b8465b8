use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "trips")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub company_id: Uuid,
    pub bus_id: Uuid,
    pub departure_time: DateTimeWithTimeZone,
    pub arrival_time: DateTimeWithTimeZone,
    pub base_price: i64,
    pub total_seats: i32,
    pub available_seats: i32,
    pub status: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::bookings::Entity")]
    Bookings,
    #[sea_orm(has_many = "super::seat_locks::Entity")]
    SeatLocks,
}

impl Related<super::bookings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bookings.def()
    }
}

impl Related<super::seat_locks::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SeatLocks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
