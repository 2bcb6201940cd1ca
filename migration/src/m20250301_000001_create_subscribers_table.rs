use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Subscribers::Table)
                    .if_not_exists()
                    .col(pk_uuid(Subscribers::Id))
                    .col(string(Subscribers::UserId).not_null())
                    .col(string(Subscribers::Country).not_null())
                    .col(string(Subscribers::Status).not_null())
                    // Product is embedded: either all three columns are set or none
                    .col(string_null(Subscribers::ProductPlanId))
                    .col(string_null(Subscribers::ProductSubscriptionId))
                    .col(string_null(Subscribers::ProductStatus))
                    .col(json_binary_null(Subscribers::Transaction))
                    .col(
                        timestamp_with_time_zone(Subscribers::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Subscribers::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_subscribers_user_id")
                    .table(Subscribers::Table)
                    .col(Subscribers::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_subscribers_country")
                    .table(Subscribers::Table)
                    .col(Subscribers::Country)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // NULLs do not collide, so subscribers without a product are unaffected
        manager
            .create_index(
                Index::create()
                    .name("idx_subscribers_product_plan_id")
                    .table(Subscribers::Table)
                    .col(Subscribers::ProductPlanId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_subscribers_product_subscription_id")
                    .table(Subscribers::Table)
                    .col(Subscribers::ProductSubscriptionId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Subscribers::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Subscribers {
    Table,
    Id,
    UserId,
    Country,
    Status,
    ProductPlanId,
    ProductSubscriptionId,
    ProductStatus,
    Transaction,
    CreatedAt,
    UpdatedAt,
}
