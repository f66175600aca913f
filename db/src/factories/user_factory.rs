use rand::Rng;
use rand::distributions::Uniform;
use sea_orm::ConnectionTrait;

use crate::models::user::Model as User;

/// Inserts a randomly named user and returns them.
pub async fn make<C: ConnectionTrait>(db: &C) -> User {
    let student_number = generate_student_number();
    let email = format!("{student_number}@example.test");

    User::create(db, &student_number, &email)
        .await
        .expect("Failed to create user")
}

// Random student number in the campus format.
fn generate_student_number() -> String {
    let mut rng = rand::thread_rng();
    let number: u32 = rng.sample(Uniform::new_inclusive(0, 99_999_999));
    format!("u{:08}", number)
}
