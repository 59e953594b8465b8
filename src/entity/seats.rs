use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "seats")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub bus_id: Uuid,
    pub seat_number: String,
    pub seat_type: String,
    pub price_multiplier: f64,
    pub is_active: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::booking_items::Entity")]
    BookingItems,
    #[sea_orm(has_many = "super::seat_locks::Entity")]
    SeatLocks,
}

impl Related<super::booking_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BookingItems.def()
    }
}

impl Related<super::seat_locks::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SeatLocks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
