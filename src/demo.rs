//! Demo menu tree served by the binary

use crate::menu::{
    ButtonSpec, CommandSpec, Menu, MenuDecl, MenuOption, MenuRef, Registry, RegistryError,
    TextRule,
};

pub struct MainMenu;

impl Menu for MainMenu {
    fn declare() -> MenuDecl {
        MenuDecl::goto(
            "MainMenu",
            [
                ButtonSpec::menu::<TestMenu>(),
                ButtonSpec::menu::<AnotherTestMenu>(),
                ButtonSpec::goto("Profile", MenuRef::of::<NameMenu>()),
            ],
        )
        .title("test")
        .description("Lorem ipsum\n\nPick a submenu.")
    }
}

pub struct AnotherTestMenu;

impl Menu for AnotherTestMenu {
    fn declare() -> MenuDecl {
        MenuDecl::goto(
            "AnotherTestMenu",
            [
                ButtonSpec::back("back"),
                ButtonSpec::goto("Got to the other Sub Menu.", MenuRef::of::<TestMenu>()),
                ButtonSpec::menu::<TestRadioMenu>(),
                ButtonSpec::menu::<TestCheckboxMenu>(),
            ],
        )
        .title("Sub Menu 2")
        .description("Something funny here.")
    }
}

pub struct TestMenu;

impl Menu for TestMenu {
    fn declare() -> MenuDecl {
        MenuDecl::goto("TestMenu", [ButtonSpec::back("back")])
            .title("Sub Menu")
            .description("We don't do sandwiches or public transport though.")
    }
}

pub struct TestCheckboxMenu;

impl Menu for TestCheckboxMenu {
    fn declare() -> MenuDecl {
        MenuDecl::checkbox(
            "TestCheckboxMenu",
            [
                MenuOption::new("eggs", "Eggs").selected(),
                MenuOption::new("milk", "Milk"),
                MenuOption::new("flux", "Flux compensator"),
                MenuOption::new("love", "LOVE"),
            ],
        )
        .title("Shopping list")
        .description("The shopping list for today.")
    }
}

pub struct TestRadioMenu;

impl Menu for TestRadioMenu {
    fn declare() -> MenuDecl {
        MenuDecl::radio(
            "TestRadioMenu",
            [
                MenuOption::new("aj", "Applejack"),
                MenuOption::new("fs", "Fluttershy"),
                MenuOption::new("rara", "Rarity"),
                MenuOption::new("ts", "Twilight"),
                MenuOption::new("pp", "Pinkie Pie"),
                MenuOption::new("waifu", "Littlepip").selected(),
                MenuOption::new("mom", "Your Mom"),
                MenuOption::new("bug", "Changelings"),
                MenuOption::new("BUG", "Cheesalys"),
                MenuOption::new(":(", "Your face"),
                MenuOption::new("just_no", "Spike"),
            ],
        )
        .title("Best Pony?")
        .description("Page {page} of {pages}")
        .page_size(5)
    }
}

// ============================================================================
// Profile form: name -> email -> password -> age -> height -> summary
// ============================================================================

pub struct NameMenu;

impl Menu for NameMenu {
    fn declare() -> MenuDecl {
        MenuDecl::text_input("NameMenu", TextRule::Text)
            .description("Tell me your name, please.")
            .next(MenuRef::of::<EmailMenu>())
            .cancel(ButtonSpec::cancel_to("Cancel", MenuRef::of::<MainMenu>()))
    }
}

pub struct EmailMenu;

impl Menu for EmailMenu {
    fn declare() -> MenuDecl {
        MenuDecl::text_input("EmailMenu", TextRule::Email)
            .title("Email")
            .description("Set an email please.")
            .next(MenuRef::of::<PasswordMenu>())
    }
}

pub struct PasswordMenu;

impl Menu for PasswordMenu {
    fn declare() -> MenuDecl {
        MenuDecl::text_input("PasswordMenu", TextRule::Password)
            .title("Password")
            .description("Set a password please.")
            .next(MenuRef::of::<AgeMenu>())
    }
}

pub struct AgeMenu;

impl Menu for AgeMenu {
    fn declare() -> MenuDecl {
        MenuDecl::text_input("AgeMenu", TextRule::Int)
            .title("Age")
            .description("Tell me your age, please.")
            .next(MenuRef::of::<HeightMenu>())
    }
}

pub struct HeightMenu;

impl Menu for HeightMenu {
    fn declare() -> MenuDecl {
        MenuDecl::text_input("HeightMenu", TextRule::Float)
            .title("Height")
            .description("Please tell me your body height in centimeters")
            .next(MenuRef::of::<ProfileMenu>())
    }
}

pub struct ProfileMenu;

impl Menu for ProfileMenu {
    fn declare() -> MenuDecl {
        MenuDecl::goto(
            "ProfileMenu",
            [
                ButtonSpec::back("Edit"),
                ButtonSpec::done_to("Looks good", MenuRef::of::<MainMenu>()),
            ],
        )
        .title("Profile")
        .description(
            "Name: {NAME_MENU}\nEmail: {EMAIL_MENU}\nPassword: {PASSWORD_MENU}\n\
             Age: {AGE_MENU}\nHeight: {HEIGHT_MENU}",
        )
    }
}

/// Registry rooted at [`MainMenu`] with `/start`, `/cancel` and `/back`
pub fn registry() -> Result<Registry, RegistryError> {
    let mut builder = Registry::builder(MenuRef::of::<MainMenu>());
    builder.command("start", CommandSpec::Restart(MenuRef::of::<MainMenu>()));
    builder.command(
        "cancel",
        CommandSpec::Press(ButtonSpec::cancel_to("Cancel", MenuRef::of::<MainMenu>())),
    );
    builder.command("back", CommandSpec::Press(ButtonSpec::back("back")));
    builder.build()
}
