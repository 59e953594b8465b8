use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "vouchers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub code: String,
    /// None = redeemable on any company's trips.
    pub company_id: Option<Uuid>,
    pub discount_type: String,
    pub discount_value: i64,
    pub min_order_value: Option<i64>,
    pub max_discount: Option<i64>,
    pub start_date: Option<DateTimeWithTimeZone>,
    pub end_date: Option<DateTimeWithTimeZone>,
    pub usage_limit: Option<i32>,
    pub usage_per_user: Option<i32>,
    pub used_count: i32,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::voucher_usages::Entity")]
    VoucherUsages,
}

impl Related<super::voucher_usages::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::VoucherUsages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
