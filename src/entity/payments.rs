use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub payment_code: String,
    pub booking_id: Uuid,
    pub company_id: Uuid,
    pub amount: i64,
    pub discount_amount: i64,
    pub voucher_id: Option<Uuid>,
    pub payment_method: String,
    pub status: String,
    pub transaction_id: Option<String>,
    pub paid_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::bookings::Entity",
        from = "Column::BookingId",
        to = "super::bookings::Column::Id"
    )]
    Bookings,
    #[sea_orm(has_many = "super::vnpay_transactions::Entity")]
    VnpayTransactions,
}

impl Related<super::bookings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bookings.def()
    }
}

impl Related<super::vnpay_transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::VnpayTransactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
