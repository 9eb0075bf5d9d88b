use clap::{Parser, Subcommand, ValueEnum};
use coursehub::Config;
use coursehub::model::entity::{
    Category, CategoryCreate, ClassType, CourseCreate, CourseEntity, TrainingLevel, UserEntity,
    UserEntityCreate,
};
use coursehub::model::{CrudRepository, DbConnection, ModelManager};
use coursehub::web::{AuthenticatedUser, UserRole};

#[derive(Parser, Debug)]
#[command(about = "CLI tool for seeding the course catalog", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserCommands,
    },

    /// Manage courses
    Course {
        #[command(subcommand)]
        action: CourseCommands,
    },

    /// Manage categories
    Category {
        #[command(subcommand)]
        action: CategoryCommands,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum RoleArg {
    Admin,
    Moderator,
    Student,
}

impl From<RoleArg> for UserRole {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Admin => UserRole::Admin,
            RoleArg::Moderator => UserRole::Moderator,
            RoleArg::Student => UserRole::Student,
        }
    }
}

/// User management
#[derive(Subcommand, Debug)]
pub enum UserCommands {
    Add {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long, value_enum, default_value = "student")]
        role: RoleArg,
        #[arg(long, default_value = "")]
        first_name: String,
        #[arg(long, default_value = "")]
        last_name: String,
    },
    /// Create the admin account from the `[admin]` config section
    CreateAdmin,
}

/// Course management
#[derive(Subcommand, Debug)]
pub enum CourseCommands {
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        title: String,
        #[arg(long, default_value_t = 0.0)]
        price: f64,
        #[arg(long, default_value_t = 4)]
        duration_weeks: i32,
        #[arg(long, default_value = "beginner")]
        level: TrainingLevel,
        #[arg(long, default_value = "online")]
        class_type: ClassType,
        #[arg(long)]
        overview: Option<String>,
        /// Category name, repeat for several
        #[arg(long = "category")]
        categories: Vec<String>,
        /// Learning objective, repeat for several
        #[arg(long = "objective")]
        objectives: Vec<String>,
    },
}

/// Category management
#[derive(Subcommand, Debug)]
pub enum CategoryCommands {
    Add {
        #[arg(long)]
        name: String,
    },
}

#[tokio::main]
async fn main() -> coursehub::error::AppResult<()> {
    let _ = dotenvy::dotenv();
    let args = Cli::parse();

    let config = Config::get_or_init(true).await;
    let database_uri =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| config.app().database_uri().to_string());

    let db_con = DbConnection::connect(&database_uri)?;
    let mm = ModelManager::new(db_con);
    let actor = AuthenticatedUser::admin();

    match args.command {
        Commands::User { action } => match action {
            UserCommands::Add {
                username,
                email,
                password,
                role,
                first_name,
                last_name,
            } => {
                let user = UserEntity::create(
                    &mm,
                    &actor,
                    UserEntityCreate {
                        username,
                        email: coursehub::auth::validate::normalize_email(&email),
                        password_hash: coursehub::auth::hash_password(&password)?,
                        first_name,
                        last_name,
                        role: role.into(),
                        address: None,
                        phone_no: None,
                        profile_picture: None,
                    },
                )
                .await?;
                println!("User created: {} ({})", user.username(), user.id());
            }
            UserCommands::CreateAdmin => {
                coursehub::ensure_admin(&mm, config).await?;
                println!("Admin account is in place");
            }
        },

        Commands::Course { action } => match action {
            CourseCommands::Add {
                name,
                title,
                price,
                duration_weeks,
                level,
                class_type,
                overview,
                categories,
                objectives,
            } => {
                let course = CourseEntity::create(
                    &mm,
                    &actor,
                    CourseCreate {
                        name,
                        title,
                        duration_weeks,
                        price,
                        training_level: level,
                        class_type,
                        image: None,
                        overview,
                        objectives,
                        prerequisites: vec![],
                        outcomes: vec![],
                        career_prospects: vec![],
                        description: Default::default(),
                        syllabus: vec![],
                        categories,
                    },
                )
                .await?;
                println!("Course created: {} ({})", course.name(), course.id());
            }
        },

        Commands::Category { action } => match action {
            CategoryCommands::Add { name } => {
                let category = Category::create(&mm, &actor, CategoryCreate { name }).await?;
                println!("Category created: {:?}", category);
            }
        },
    }

    Ok(())
}
