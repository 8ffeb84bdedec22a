use retail_pos_api::{
    db::{create_pool, run_migrations},
    dto::{
        instances::{ReceiveInstancesRequest, UpdateInstanceRequest},
        products::CreateProductRequest,
        sales::{
            AddToCartRequest, CompleteTransactionRequest, DiscountRequest, EditCartItemRequest,
            OpenTransactionRequest,
        },
    },
    entity::{
        AuditLogs, ProductInstances, SaleTransactions, audit_logs, product_instances,
    },
    error::AppError,
    middleware::auth::AuthUser,
    models::{DiscountType, Product, ProductType, SaleStatus},
    services::{cart_service, instance_service, product_service, sale_service},
    state::AppState,
};
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Statement,
};
use uuid::Uuid;

// Each test creates its own products and sales, so the tests can share one database
// and run in parallel without truncating tables.

async fn setup_state() -> anyhow::Result<Option<AppState>> {
    // Allow skipping when no DB is configured in the environment.
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run cart flow tests.");
            return Ok(None);
        }
    };
    let state = AppState::new(create_pool(&database_url).await?);
    run_migrations(&state.orm).await?;
    Ok(Some(state))
}

fn cashier() -> AuthUser {
    AuthUser {
        person_id: Uuid::new_v4(),
        role: "cashier".into(),
    }
}

async fn stocked_product(
    state: &AppState,
    user: &AuthUser,
    price: i64,
    units: i32,
) -> anyhow::Result<Product> {
    let product = product_service::create_product(
        state,
        user,
        CreateProductRequest {
            sku: format!("TEST-{}", Uuid::new_v4()),
            name: "Test Lotion".into(),
            product_type: ProductType::Simple,
            target_price: price,
            parent_id: None,
            variation: None,
            category_id: None,
        },
    )
    .await?
    .data
    .expect("product");

    if units > 0 {
        instance_service::receive_instances(
            state,
            user,
            ReceiveInstancesRequest {
                product_id: product.id,
                quantity: units,
                invoice_cost: price / 2,
                purchase_order: Some("PO-TEST".into()),
            },
        )
        .await?;
    }
    Ok(product)
}

async fn open_sale(state: &AppState, user: &AuthUser) -> anyhow::Result<Uuid> {
    let sale = sale_service::open_transaction(state, user, OpenTransactionRequest::default())
        .await?
        .data
        .expect("sale");
    assert_eq!(sale.status, SaleStatus::Open);
    assert_eq!(sale.source_person_id, Some(user.person_id));
    Ok(sale.id)
}

async fn units_in_sale(state: &AppState, sale_id: Uuid) -> anyhow::Result<Vec<product_instances::Model>> {
    Ok(ProductInstances::find()
        .filter(product_instances::Column::SaleTransactionId.eq(sale_id))
        .order_by_asc(product_instances::Column::CreatedAt)
        .order_by_asc(product_instances::Column::Id)
        .all(&state.orm)
        .await?)
}

#[tokio::test]
async fn adding_two_of_five_leaves_three_free() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let user = cashier();
    let product = stocked_product(&state, &user, 899, 5).await?;
    let sale_id = open_sale(&state, &user).await?;

    let change = cart_service::add_to_cart(
        &state,
        &user,
        sale_id,
        AddToCartRequest {
            product_id: product.id,
            quantity: 2,
        },
    )
    .await?
    .data
    .expect("change");

    assert_eq!(change.assigned, 2);
    assert_eq!(change.quantity, 2);
    assert_eq!(units_in_sale(&state, sale_id).await?.len(), 2);
    assert_eq!(product_service::free_units(&state.orm, product.id).await?, 3);

    let cart = cart_service::list_cart(&state, sale_id).await?.data.expect("cart");
    assert_eq!(cart.lines.len(), 1);
    assert_eq!(cart.lines[0].quantity, 2);
    assert_eq!(cart.totals.gross, 1798);
    Ok(())
}

#[tokio::test]
async fn add_is_capped_by_free_stock() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let user = cashier();
    let product = stocked_product(&state, &user, 450, 2).await?;
    let sale_id = open_sale(&state, &user).await?;

    let change = cart_service::add_to_cart(
        &state,
        &user,
        sale_id,
        AddToCartRequest {
            product_id: product.id,
            quantity: 5,
        },
    )
    .await?
    .data
    .expect("change");
    assert_eq!(change.requested, 5);
    assert_eq!(change.assigned, 2);

    let again = cart_service::add_to_cart(
        &state,
        &user,
        sale_id,
        AddToCartRequest {
            product_id: product.id,
            quantity: 1,
        },
    )
    .await;
    assert!(matches!(again, Err(AppError::BadRequest(_))));
    Ok(())
}

#[tokio::test]
async fn editing_three_down_to_one_releases_two_newest() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let user = cashier();
    let product = stocked_product(&state, &user, 1200, 4).await?;
    let sale_id = open_sale(&state, &user).await?;

    cart_service::edit_cart_item(
        &state,
        &user,
        sale_id,
        product.id,
        EditCartItemRequest { quantity: 3 },
    )
    .await?;
    let before = units_in_sale(&state, sale_id).await?;
    assert_eq!(before.len(), 3);

    let change = cart_service::edit_cart_item(
        &state,
        &user,
        sale_id,
        product.id,
        EditCartItemRequest { quantity: 1 },
    )
    .await?
    .data
    .expect("change");
    assert_eq!(change.released, 2);
    assert_eq!(change.quantity, 1);

    let after = units_in_sale(&state, sale_id).await?;
    assert_eq!(after.len(), 1);
    assert_eq!(after[0].id, before[0].id);
    assert_eq!(product_service::free_units(&state.orm, product.id).await?, 3);

    let unchanged = cart_service::edit_cart_item(
        &state,
        &user,
        sale_id,
        product.id,
        EditCartItemRequest { quantity: 1 },
    )
    .await?
    .data
    .expect("change");
    assert_eq!(unchanged.assigned + unchanged.released, 0);
    Ok(())
}

#[tokio::test]
async fn remove_releases_every_unit_of_the_product() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let user = cashier();
    let lotion = stocked_product(&state, &user, 899, 3).await?;
    let tea = stocked_product(&state, &user, 450, 3).await?;
    let sale_id = open_sale(&state, &user).await?;

    for (product_id, quantity) in [(lotion.id, 3), (tea.id, 1)] {
        cart_service::add_to_cart(&state, &user, sale_id, AddToCartRequest { product_id, quantity })
            .await?;
    }

    let change = cart_service::remove_from_cart(&state, &user, sale_id, lotion.id)
        .await?
        .data
        .expect("change");
    assert_eq!(change.released, 3);

    let remaining = units_in_sale(&state, sale_id).await?;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].product_id, tea.id);

    let missing = cart_service::remove_from_cart(&state, &user, sale_id, lotion.id).await;
    assert!(matches!(missing, Err(AppError::NotFound)));
    Ok(())
}

#[tokio::test]
async fn cancelling_returns_units_and_deletes_sale() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let user = cashier();
    let product = stocked_product(&state, &user, 500, 4).await?;
    let sale_id = open_sale(&state, &user).await?;
    cart_service::add_to_cart(
        &state,
        &user,
        sale_id,
        AddToCartRequest {
            product_id: product.id,
            quantity: 4,
        },
    )
    .await?;

    let released = cart_service::cancel_transaction(&state, &user, sale_id).await?;
    assert_eq!(released, 4);
    assert!(units_in_sale(&state, sale_id).await?.is_empty());
    assert_eq!(product_service::free_units(&state.orm, product.id).await?, 4);
    assert!(SaleTransactions::find_by_id(sale_id).one(&state.orm).await?.is_none());

    let audited = AuditLogs::find()
        .filter(audit_logs::Column::ActorId.eq(user.person_id))
        .filter(audit_logs::Column::Action.eq("sale_cancel"))
        .count(&state.orm)
        .await?;
    assert_eq!(audited, 1);

    let again = cart_service::cancel_transaction(&state, &user, sale_id).await;
    assert!(matches!(again, Err(AppError::NotFound)));
    Ok(())
}

#[tokio::test]
async fn completing_splits_dollar_discount_to_the_cent() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let user = cashier();
    let product = stocked_product(&state, &user, 2000, 3).await?;
    let sale_id = open_sale(&state, &user).await?;
    cart_service::add_to_cart(
        &state,
        &user,
        sale_id,
        AddToCartRequest {
            product_id: product.id,
            quantity: 3,
        },
    )
    .await?;

    let done = cart_service::complete_transaction(
        &state,
        &user,
        sale_id,
        CompleteTransactionRequest {
            discount: Some(DiscountRequest {
                discount_type: DiscountType::Dollar,
                value: 1000,
            }),
        },
    )
    .await?
    .data
    .expect("completed");
    assert_eq!(done.transaction.status, SaleStatus::Complete);
    assert!(done.transaction.date_time.is_some());
    assert_eq!(done.cart.totals.discount, 1000);
    assert_eq!(done.cart.totals.net, 5000);

    let units = units_in_sale(&state, sale_id).await?;
    let discounts: Vec<i64> = units.iter().map(|u| u.discount).collect();
    assert_eq!(discounts, vec![334, 333, 333]);
    assert!(units.iter().all(|u| u.discount_type.as_deref() == Some("DOLLAR")));
    assert!(units
        .iter()
        .all(|u| u.final_sale_price == Some(2000 - u.discount)));

    let late_add = cart_service::add_to_cart(
        &state,
        &user,
        sale_id,
        AddToCartRequest {
            product_id: product.id,
            quantity: 1,
        },
    )
    .await;
    assert!(matches!(late_add, Err(AppError::BadRequest(_))));
    let late_cancel = cart_service::cancel_transaction(&state, &user, sale_id).await;
    assert!(matches!(late_cancel, Err(AppError::BadRequest(_))));
    Ok(())
}

#[tokio::test]
async fn completing_an_empty_cart_is_rejected() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let user = cashier();
    let sale_id = open_sale(&state, &user).await?;
    let result = cart_service::complete_transaction(
        &state,
        &user,
        sale_id,
        CompleteTransactionRequest::default(),
    )
    .await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));
    Ok(())
}

#[tokio::test]
async fn variable_products_cannot_enter_a_cart() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let user = cashier();
    let parent = product_service::create_product(
        &state,
        &user,
        CreateProductRequest {
            sku: format!("TEST-VAR-{}", Uuid::new_v4()),
            name: "Shampoo".into(),
            product_type: ProductType::Variable,
            target_price: 0,
            parent_id: None,
            variation: None,
            category_id: None,
        },
    )
    .await?
    .data
    .expect("parent");
    let sale_id = open_sale(&state, &user).await?;

    let result = cart_service::add_to_cart(
        &state,
        &user,
        sale_id,
        AddToCartRequest {
            product_id: parent.id,
            quantity: 1,
        },
    )
    .await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));
    Ok(())
}

#[tokio::test]
async fn assigned_units_always_reference_an_existing_sale() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let backend = state.orm.get_database_backend();
    let row = state
        .orm
        .query_one(Statement::from_string(
            backend,
            r#"
            SELECT COUNT(*)::BIGINT AS dangling
            FROM product_instances pi
            LEFT JOIN sale_transactions st ON st.id = pi.sale_transaction_id
            WHERE pi.sale_transaction_id IS NOT NULL AND st.id IS NULL
            "#,
        ))
        .await?
        .expect("row");
    let dangling: i64 = row.try_get("", "dangling")?;
    assert_eq!(dangling, 0);
    Ok(())
}

#[tokio::test]
async fn editing_to_zero_behaves_like_remove() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let user = cashier();
    let product = stocked_product(&state, &user, 700, 3).await?;
    let sale_id = open_sale(&state, &user).await?;

    let nothing = cart_service::edit_cart_item(
        &state,
        &user,
        sale_id,
        product.id,
        EditCartItemRequest { quantity: 0 },
    )
    .await;
    assert!(matches!(nothing, Err(AppError::NotFound)));

    cart_service::add_to_cart(
        &state,
        &user,
        sale_id,
        AddToCartRequest {
            product_id: product.id,
            quantity: 2,
        },
    )
    .await?;
    let change = cart_service::edit_cart_item(
        &state,
        &user,
        sale_id,
        product.id,
        EditCartItemRequest { quantity: 0 },
    )
    .await?
    .data
    .expect("change");
    assert_eq!(change.released, 2);
    assert_eq!(change.quantity, 0);
    assert!(units_in_sale(&state, sale_id).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn completing_with_percent_discount_rounds_each_unit() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let user = cashier();
    let product = stocked_product(&state, &user, 999, 2).await?;
    let sale_id = open_sale(&state, &user).await?;
    cart_service::add_to_cart(
        &state,
        &user,
        sale_id,
        AddToCartRequest {
            product_id: product.id,
            quantity: 2,
        },
    )
    .await?;

    let done = cart_service::complete_transaction(
        &state,
        &user,
        sale_id,
        CompleteTransactionRequest {
            discount: Some(DiscountRequest {
                discount_type: DiscountType::Percent,
                value: 15,
            }),
        },
    )
    .await?
    .data
    .expect("completed");

    // 15% of 999 is 149.85 cents.
    let units = units_in_sale(&state, sale_id).await?;
    assert_eq!(units.len(), 2);
    for unit in &units {
        assert_eq!(unit.discount, 150);
        assert_eq!(unit.discount_type.as_deref(), Some("PERCENT"));
        assert_eq!(unit.final_sale_price, Some(849));
    }
    assert_eq!(done.cart.totals.gross, 1998);
    assert_eq!(done.cart.totals.discount, 300);
    assert_eq!(done.cart.totals.net, 1698);
    Ok(())
}

#[tokio::test]
async fn completing_without_cart_discount_keeps_unit_discounts() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let user = cashier();
    let product = stocked_product(&state, &user, 1000, 2).await?;
    let sale_id = open_sale(&state, &user).await?;
    cart_service::add_to_cart(
        &state,
        &user,
        sale_id,
        AddToCartRequest {
            product_id: product.id,
            quantity: 2,
        },
    )
    .await?;
    let units = units_in_sale(&state, sale_id).await?;
    instance_service::update_instance(
        &state,
        &user,
        units[0].id,
        UpdateInstanceRequest {
            discount: Some(250),
            discount_type: Some(DiscountType::Dollar),
            ..Default::default()
        },
    )
    .await?;

    let done = cart_service::complete_transaction(
        &state,
        &user,
        sale_id,
        CompleteTransactionRequest::default(),
    )
    .await?
    .data
    .expect("completed");
    assert_eq!(done.cart.totals.discount, 250);
    assert_eq!(done.cart.totals.net, 1750);

    let units = units_in_sale(&state, sale_id).await?;
    assert_eq!(units[0].final_sale_price, Some(750));
    assert_eq!(units[1].discount, 0);
    assert_eq!(units[1].final_sale_price, Some(1000));

    let sold = instance_service::update_instance(
        &state,
        &user,
        units[0].id,
        UpdateInstanceRequest {
            discount: Some(100),
            ..Default::default()
        },
    )
    .await;
    assert!(matches!(sold, Err(AppError::BadRequest(_))));
    Ok(())
}

#[tokio::test]
async fn dollar_discount_above_cart_total_is_rejected() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let user = cashier();
    let product = stocked_product(&state, &user, 100, 3).await?;
    let sale_id = open_sale(&state, &user).await?;
    cart_service::add_to_cart(
        &state,
        &user,
        sale_id,
        AddToCartRequest {
            product_id: product.id,
            quantity: 3,
        },
    )
    .await?;

    let result = cart_service::complete_transaction(
        &state,
        &user,
        sale_id,
        CompleteTransactionRequest {
            discount: Some(DiscountRequest {
                discount_type: DiscountType::Dollar,
                value: 1000,
            }),
        },
    )
    .await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));

    let sale = SaleTransactions::find_by_id(sale_id)
        .one(&state.orm)
        .await?
        .expect("sale");
    assert_eq!(sale.status, "OPEN");
    assert!(units_in_sale(&state, sale_id)
        .await?
        .iter()
        .all(|u| u.final_sale_price.is_none()));
    Ok(())
}

#[tokio::test]
async fn concurrent_adds_never_oversell() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let user = cashier();
    let product = stocked_product(&state, &user, 300, 5).await?;

    for _ in 0..10 {
        let first = open_sale(&state, &user).await?;
        let second = open_sale(&state, &user).await?;
        let add = |sale_id| {
            cart_service::add_to_cart(
                &state,
                &user,
                sale_id,
                AddToCartRequest {
                    product_id: product.id,
                    quantity: 4,
                },
            )
        };
        let (a, b) = tokio::join!(add(first), add(second));
        let assigned = [a, b]
            .into_iter()
            .map(|r| r.map(|res| res.data.map_or(0, |c| c.assigned)).unwrap_or(0))
            .sum::<i64>();
        assert_eq!(assigned, 5);
        assert_eq!(product_service::free_units(&state.orm, product.id).await?, 0);
        assert_eq!(
            units_in_sale(&state, first).await?.len() + units_in_sale(&state, second).await?.len(),
            5
        );

        cart_service::cancel_transaction(&state, &user, first).await?;
        cart_service::cancel_transaction(&state, &user, second).await?;
        assert_eq!(product_service::free_units(&state.orm, product.id).await?, 5);
    }
    Ok(())
}

#[tokio::test]
async fn discount_edit_racing_checkout_stays_consistent() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let user = cashier();
    let product = stocked_product(&state, &user, 1000, 20).await?;

    for _ in 0..20 {
        let sale_id = open_sale(&state, &user).await?;
        cart_service::add_to_cart(
            &state,
            &user,
            sale_id,
            AddToCartRequest {
                product_id: product.id,
                quantity: 1,
            },
        )
        .await?;
        let unit_id = units_in_sale(&state, sale_id).await?[0].id;

        let (edit, done) = tokio::join!(
            instance_service::update_instance(
                &state,
                &user,
                unit_id,
                UpdateInstanceRequest {
                    discount: Some(400),
                    discount_type: Some(DiscountType::Dollar),
                    ..Default::default()
                },
            ),
            cart_service::complete_transaction(
                &state,
                &user,
                sale_id,
                CompleteTransactionRequest::default(),
            )
        );
        done?;
        if let Err(err) = edit {
            assert!(matches!(err, AppError::BadRequest(_)));
        }

        let unit = ProductInstances::find_by_id(unit_id)
            .one(&state.orm)
            .await?
            .expect("unit");
        assert_eq!(unit.final_sale_price, Some(1000 - unit.discount));
    }
    Ok(())
}
