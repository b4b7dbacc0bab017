//! Initial schema migration - creates all tables from scratch.
//!
//! - `dispensers`: tap points with their flow volume and current status
//! - `ledgers`: accumulated spending per dispenser
//! - `usage_intervals`: individual open/close cycles with their cost

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum Dispensers {
    Table,
    Id,
    FlowVolume,
    Status,
    LastUpdatedAt,
}

#[derive(Iden)]
enum Ledgers {
    Table,
    DispenserId,
    TotalAmount,
}

#[derive(Iden)]
enum UsageIntervals {
    Table,
    Id,
    DispenserId,
    OpenedAt,
    ClosedAt,
    FlowVolume,
    TotalSpent,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Dispensers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Dispensers::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Dispensers::FlowVolume).double().not_null())
                    .col(ColumnDef::new(Dispensers::Status).string().not_null())
                    .col(
                        ColumnDef::new(Dispensers::LastUpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Ledgers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Ledgers::DispenserId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Ledgers::TotalAmount).double().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-ledgers-dispenser_id")
                            .from(Ledgers::Table, Ledgers::DispenserId)
                            .to(Dispensers::Table, Dispensers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UsageIntervals::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UsageIntervals::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(UsageIntervals::DispenserId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UsageIntervals::OpenedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(UsageIntervals::ClosedAt).timestamp())
                    .col(
                        ColumnDef::new(UsageIntervals::FlowVolume)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UsageIntervals::TotalSpent)
                            .double()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-usage_intervals-dispenser_id")
                            .from(UsageIntervals::Table, UsageIntervals::DispenserId)
                            .to(Ledgers::Table, Ledgers::DispenserId)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-usage_intervals-dispenser_id")
                    .table(UsageIntervals::Table)
                    .col(UsageIntervals::DispenserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop in reverse order of creation (respecting FK dependencies)
        manager
            .drop_table(Table::drop().table(UsageIntervals::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Ledgers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Dispensers::Table).to_owned())
            .await?;
        Ok(())
    }
}
