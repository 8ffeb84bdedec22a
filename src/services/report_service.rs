use chrono::{Duration, NaiveDate, Utc};
use sea_orm::{DbBackend, FromQueryResult, Statement};

use crate::{
    dto::reports::{DailySales, SalesFigures, SalesReport, SalesReportQuery},
    error::{AppError, AppResult},
    models::SaleStatus,
    response::{ApiResponse, Meta},
    state::AppState,
};

const DEFAULT_WINDOW_DAYS: i64 = 30;
const MAX_WINDOW_DAYS: i64 = 366;

#[derive(Debug, FromQueryResult)]
struct DailyRow {
    day: NaiveDate,
    transactions: i64,
    units: i64,
    gross: i64,
    discounts: i64,
    net: i64,
}

const DAILY_SALES_SQL: &str = r#"
    SELECT (st.date_time AT TIME ZONE 'UTC')::date AS day,
           COUNT(DISTINCT st.id)::BIGINT AS transactions,
           COUNT(pi.id)::BIGINT AS units,
           COALESCE(SUM(p.target_price), 0)::BIGINT AS gross,
           COALESCE(SUM(pi.discount), 0)::BIGINT AS discounts,
           COALESCE(SUM(pi.final_sale_price), 0)::BIGINT AS net
    FROM sale_transactions st
    LEFT JOIN product_instances pi ON pi.sale_transaction_id = st.id
    LEFT JOIN products p ON p.id = pi.product_id
    WHERE st.status = $3
      AND (st.date_time AT TIME ZONE 'UTC')::date BETWEEN $1 AND $2
    GROUP BY day
    ORDER BY day
"#;

/// Completed sales per calendar day (UTC) over an inclusive date range.
pub async fn sales_summary(
    state: &AppState,
    query: SalesReportQuery,
) -> AppResult<ApiResponse<SalesReport>> {
    let (from, to) = resolve_range(query.from, query.to, Utc::now().date_naive())?;

    let rows = DailyRow::find_by_statement(Statement::from_sql_and_values(
        DbBackend::Postgres,
        DAILY_SALES_SQL,
        [from.into(), to.into(), SaleStatus::Complete.as_str().into()],
    ))
    .all(&state.orm)
    .await?;

    let days: Vec<DailySales> = rows
        .into_iter()
        .map(|row| DailySales {
            day: row.day,
            figures: SalesFigures {
                transactions: row.transactions,
                units: row.units,
                gross: row.gross,
                discounts: row.discounts,
                net: row.net,
            },
        })
        .collect();
    let totals = sum_figures(&days);
    let total_days = days.len() as i64;

    Ok(ApiResponse::success(
        "Sales report",
        SalesReport {
            from,
            to,
            days,
            totals,
        },
        Some(Meta::new(1, total_days, total_days)),
    ))
}

pub fn resolve_range(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    today: NaiveDate,
) -> AppResult<(NaiveDate, NaiveDate)> {
    let to = to.unwrap_or(today);
    let from = from.unwrap_or(to - Duration::days(DEFAULT_WINDOW_DAYS));
    if from > to {
        return Err(AppError::BadRequest("`from` must not be after `to`".into()));
    }
    if (to - from).num_days() > MAX_WINDOW_DAYS {
        return Err(AppError::BadRequest(format!(
            "report range cannot exceed {MAX_WINDOW_DAYS} days"
        )));
    }
    Ok((from, to))
}

pub fn sum_figures(days: &[DailySales]) -> SalesFigures {
    days.iter().fold(SalesFigures::default(), |mut acc, day| {
        acc.transactions += day.figures.transactions;
        acc.units += day.figures.units;
        acc.gross += day.figures.gross;
        acc.discounts += day.figures.discounts;
        acc.net += day.figures.net;
        acc
    })
}
