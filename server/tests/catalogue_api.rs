//! Categories, cars, drivers and maintenance records over HTTP.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod common;

use axum::http::{Method, StatusCode};
use common::{FilePart, TestApp};
use serde_json::json;

#[tokio::test]
async fn categories_and_brand_catalogue() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;

    let (status, body) = app
        .json(
            Method::POST,
            "/car-categories",
            Some(&admin),
            json!({"car_brand": "Honda", "type": "SUV"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["data"]["id"].as_i64().unwrap();

    let (status, _) = app
        .json(
            Method::POST,
            "/car-categories",
            Some(&admin),
            json!({"car_brand": "Honda", "type": "SUV"}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    app.json(
        Method::POST,
        "/car-categories",
        Some(&admin),
        json!({"car_brand": "Honda", "type": "Hatchback"}),
    )
    .await;

    // Single category is public, the list is not.
    let (status, body) = app.get(&format!("/car-categories/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["type"], "SUV");
    let (status, _) = app.get("/car-categories", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.get("/car-brands", None).await;
    assert_eq!(status, StatusCode::OK);
    let brands = body["data"].as_array().unwrap();
    assert_eq!(brands.len(), 1);
    assert_eq!(brands[0]["car_brand"], "Honda");
    assert_eq!(brands[0]["types"].as_array().unwrap().len(), 2);

    let (status, body) = app
        .json(
            Method::PUT,
            &format!("/car-categories/{id}"),
            Some(&admin),
            json!({"type": "Crossover"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["car_brand"], "Honda");
    assert_eq!(body["data"]["type"], "Crossover");

    let (status, _) = app.delete(&format!("/car-categories/{id}"), Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.get(&format!("/car-categories/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn customers_cannot_manage_the_catalogue() {
    let app = TestApp::new().await;
    let customer = app.customer_token("ayu@example.com", "0811").await;

    let (status, _) = app
        .json(
            Method::POST,
            "/car-categories",
            Some(&customer),
            json!({"car_brand": "Honda", "type": "SUV"}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn car_is_created_with_slug_and_image() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;

    let car = app.seed_car(&admin, "Avanza", "D 1234 ABC", "1001", "300000").await;
    let slug = car["slug"].as_str().unwrap();
    assert!(slug.starts_with("avanza-"), "{slug}");
    assert_eq!(car["status"], "Available");
    assert_eq!(car["price"], "300000.00");
    assert_eq!(car["car_brand"], "Toyota");
    assert!(car["image"].as_str().unwrap().starts_with("/uploads/"));
    assert_eq!(app.stored_images(), 1);

    // By slug, publicly.
    let (status, body) = app.get(&format!("/cars/{slug}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], car["id"]);

    let (status, body) = app.get("/cars?car_brand=Toyota&type=MPV", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["cars"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["pagination"]["total_cars"], 1);

    let (status, body) = app.get("/cars?car_brand=Honda", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["cars"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn rejected_car_leaves_no_image_behind() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    app.seed_car(&admin, "Avanza", "D 1234 ABC", "1001", "300000").await;

    // Same plate number.
    let (status, _) = app
        .multipart(
            Method::POST,
            "/cars",
            Some(&admin),
            &[
                ("car_brand", "Toyota"),
                ("type", "MPV"),
                ("name", "Innova"),
                ("transmission", "MT"),
                ("fuel", "Diesel"),
                ("color", "Black"),
                ("plate_number", "D 1234 ABC"),
                ("capacity", "8"),
                ("registration_number", "1002"),
                ("price", "450000"),
            ],
            &[FilePart::png("image")],
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(app.stored_images(), 1);

    // No image at all.
    let (status, _) = app
        .multipart(
            Method::POST,
            "/cars",
            Some(&admin),
            &[("car_brand", "Toyota"), ("type", "MPV"), ("name", "Innova")],
            &[],
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Unsupported type.
    let gif = FilePart {
        field: "image",
        file_name: "car.gif",
        content_type: "image/gif",
        bytes: b"GIF89a",
    };
    let (status, _) = app
        .multipart(
            Method::POST,
            "/cars",
            Some(&admin),
            &[
                ("car_brand", "Toyota"),
                ("type", "MPV"),
                ("name", "Innova"),
                ("transmission", "MT"),
                ("fuel", "Diesel"),
                ("color", "Black"),
                ("plate_number", "D 9999 XYZ"),
                ("capacity", "8"),
                ("registration_number", "1003"),
                ("price", "450000"),
            ],
            &[gif],
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.stored_images(), 1);
}

#[tokio::test]
async fn unknown_category_is_not_found() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;

    let (status, body) = app
        .multipart(
            Method::POST,
            "/cars",
            Some(&admin),
            &[
                ("car_brand", "Tesla"),
                ("type", "Sedan"),
                ("name", "Model 3"),
                ("transmission", "AT"),
                ("fuel", "Petrol"),
                ("color", "White"),
                ("plate_number", "B 3 EV"),
                ("capacity", "5"),
                ("registration_number", "3003"),
                ("price", "900000"),
            ],
            &[FilePart::png("image")],
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Car brand or type doesn't exist in database");
    assert_eq!(app.stored_images(), 0);
}

#[tokio::test]
async fn rename_keeps_slug_suffix_and_image_is_replaced() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let car = app.seed_car(&admin, "Avanza", "D 1234 ABC", "1001", "300000").await;
    let id = car["id"].as_i64().unwrap();
    let suffix = car["slug"].as_str().unwrap().rsplit('-').next().unwrap().to_string();

    let (status, body) = app
        .multipart(
            Method::PUT,
            &format!("/cars/{id}"),
            Some(&admin),
            &[("name", "Avanza Veloz"), ("price", "350000")],
            &[],
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["slug"], format!("avanza-veloz-{suffix}"));
    assert_eq!(body["data"]["price"], "350000.00");
    assert_eq!(body["data"]["plate_number"], "D 1234 ABC");

    let (status, body) = app
        .multipart(
            Method::PUT,
            &format!("/cars/upload-image/{id}"),
            Some(&admin),
            &[],
            &[FilePart::png("image")],
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(body["data"]["image"], car["image"]);
    assert_eq!(app.stored_images(), 1);

    let (status, _) = app.delete(&format!("/cars/{id}"), Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.stored_images(), 0);
}

#[tokio::test]
async fn drivers_lifecycle() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let customer = app.customer_token("ayu@example.com", "0811").await;

    let driver = app.seed_driver(&admin, "Budi Santoso", "081298765432", "SIM-0001").await;
    assert_eq!(driver["status"], "Available");
    let id = driver["id"].as_i64().unwrap();

    let (status, _) = app
        .json(
            Method::POST,
            "/drivers",
            Some(&admin),
            json!({
                "name": "Other Driver",
                "gender": "Male",
                "dob": "1990-01-01",
                "address": "Jl. Braga 1",
                "phone_number": "081298765432",
                "license_number": "SIM-0002"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app.get("/drivers-available", Some(&customer)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = app
        .json(
            Method::PUT,
            &format!("/drivers/{id}"),
            Some(&admin),
            json!({"status": "Booked"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .json(
            Method::PUT,
            &format!("/drivers/{id}"),
            Some(&admin),
            json!({"status": "Unavailable"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "Unavailable");
    assert_eq!(body["data"]["name"], "Budi Santoso");

    let (_, body) = app.get("/drivers-available", Some(&customer)).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);

    let (status, _) = app.delete(&format!("/drivers/{id}"), Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.get(&format!("/drivers/{id}"), Some(&customer)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn maintenance_records() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    app.seed_car(&admin, "Avanza", "D 1234 ABC", "1001", "300000").await;

    let (status, body) = app
        .json(
            Method::POST,
            "/car-maintenances",
            Some(&admin),
            json!({
                "car_name": "Xenia",
                "maintenance_date": "2025-01-01",
                "description": "Oil change",
                "cost": 250000
            }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Car name doesn't exist in database!");

    let record = json!({
        "car_name": "Avanza",
        "maintenance_date": "2025-01-01",
        "description": "Oil change",
        "cost": 250000
    });
    let (status, body) = app
        .json(Method::POST, "/car-maintenances", Some(&admin), record.clone())
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["car_name"], "Avanza");
    assert_eq!(body["data"]["cost"], "250000.00");
    let id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = app
        .json(Method::POST, "/car-maintenances", Some(&admin), record)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "A car maintenance record with the same date and description already exists!"
    );

    let (status, body) = app
        .json(
            Method::PUT,
            &format!("/car-maintenances/{id}"),
            Some(&admin),
            json!({"cost": "300000.50"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["cost"], "300000.50");
    assert_eq!(body["data"]["description"], "Oil change");

    let (status, body) = app.get("/car-maintenances", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["pagination"]["total_car_maintenances"], 1);
}

#[tokio::test]
async fn accented_names_get_ascii_slugs() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let car = app.seed_car(&admin, "Citroën Ë-C4", "D 4444 CE", "4004", "450000").await;

    let slug = car["slug"].as_str().unwrap();
    assert!(slug.starts_with("citroen-e-c4-"), "{slug}");
    assert!(slug.is_ascii());

    let (status, body) = app.get(&format!("/cars/{slug}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Citroën Ë-C4");
}
