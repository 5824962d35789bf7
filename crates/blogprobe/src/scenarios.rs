//! End-to-end scenarios for the blog application.
//!
//! ```text
//! Blog app
//! ├── Login form is shown
//! ├── Login
//! │   ├── succeeds with correct credentials
//! │   └── fails with wrong credentials
//! └── When logged in
//!     ├── a new blog can be created
//!     └── a blog can be deleted
//! ```

use crate::actions::{create_blog, delete_blog, login_with};
use crate::dialog::{DialogAction, DialogKind};
use crate::expect::expect;
use crate::locator::Locator;
use crate::model::{added_notice, NewBlog};
use crate::page::PageDriver;
use crate::result::{ProbeError, ProbeResult};
use crate::setup::{ScenarioContext, ScenarioState};
use crate::suite::{TestCase, TestSuite};
use crate::ui;
use futures::future::BoxFuture;

/// Title of the blog created through the UI
pub const CREATED_TITLE: &str = "a note created by playwright3";
/// Author of the blog created through the UI
pub const CREATED_AUTHOR: &str = "jabs3";
/// Url of the blog created through the UI
pub const CREATED_URL: &str = "www.consistency_leads_to_conviction.com";
/// Likes typed into the creation form
pub const CREATED_LIKES: &str = "80";

/// Blog that exists before the deletion scenario starts
#[must_use]
pub fn deletable_blog() -> NewBlog {
    NewBlog::new(
        "React patterns",
        "Michael Chan",
        "https://reactpatterns.com/",
        "7",
    )
}

/// The full nested suite
#[must_use]
pub fn blog_app_suite<D: PageDriver>() -> TestSuite<D> {
    TestSuite::new("Blog app")
        .with_test(TestCase::new("Login form is shown", login_form_is_shown::<D>))
        .with_suite(
            TestSuite::new("Login")
                .with_test(TestCase::new(
                    "succeeds with correct credentials",
                    login_succeeds::<D>,
                ))
                .with_test(TestCase::new(
                    "fails with wrong credentials",
                    login_fails::<D>,
                )),
        )
        .with_suite(
            TestSuite::new("When logged in")
                .with_test(TestCase::new(
                    "a new blog can be created",
                    blog_can_be_created::<D>,
                ))
                .with_test(
                    TestCase::new("a blog can be deleted", blog_can_be_deleted::<D>)
                        .with_blog(deletable_blog()),
                ),
        )
}

/// Heading and footer render on the landing page
pub fn login_form_is_shown<D: PageDriver>(
    ctx: &mut ScenarioContext<D>,
) -> BoxFuture<'_, ProbeResult<()>> {
    Box::pin(async move {
        expect(ctx.page(), Locator::text(ui::HEADING))
            .to_be_visible()
            .await?;
        expect(ctx.page(), Locator::text(ui::FOOTER))
            .to_be_visible()
            .await
    })
}

/// Correct credentials show the display-name banner
pub fn login_succeeds<D: PageDriver>(
    ctx: &mut ScenarioContext<D>,
) -> BoxFuture<'_, ProbeResult<()>> {
    Box::pin(async move { log_in(ctx).await })
}

/// A wrong password shows a red, bordered error and no banner
pub fn login_fails<D: PageDriver>(
    ctx: &mut ScenarioContext<D>,
) -> BoxFuture<'_, ProbeResult<()>> {
    Box::pin(async move {
        let username = ctx.user().username.clone();
        let banner = ctx.user().logged_in_banner();
        login_with(ctx.page_mut(), &username, "wrong").await?;

        let error = expect(ctx.page(), Locator::text(ui::LOGIN_ERROR));
        error.to_be_visible().await?;
        error
            .to_have_css("border-style", ui::ERROR_BORDER_STYLE)
            .await?;
        error.to_have_css("color", ui::ERROR_COLOR).await?;

        expect(ctx.page(), Locator::text(banner))
            .not_to_be_visible()
            .await
    })
}

/// Creating a blog shows the "added" notice
pub fn blog_can_be_created<D: PageDriver>(
    ctx: &mut ScenarioContext<D>,
) -> BoxFuture<'_, ProbeResult<()>> {
    Box::pin(async move {
        log_in(ctx).await?;

        create_blog(
            ctx.page_mut(),
            CREATED_TITLE,
            CREATED_AUTHOR,
            CREATED_URL,
            CREATED_LIKES,
        )
        .await?;
        expect(
            ctx.page(),
            Locator::text(added_notice(CREATED_TITLE, CREATED_AUTHOR)),
        )
        .to_be_visible()
        .await?;
        ctx.transition(ScenarioState::Created)
    })
}

/// Deleting an owned blog after accepting the confirmation removes it
pub fn blog_can_be_deleted<D: PageDriver>(
    ctx: &mut ScenarioContext<D>,
) -> BoxFuture<'_, ProbeResult<()>> {
    Box::pin(async move {
        let title = deletable_blog().title;
        log_in(ctx).await?;

        expect(ctx.page(), Locator::text(title.as_str()))
            .to_be_visible()
            .await?;
        ctx.transition(ScenarioState::Listed)?;

        delete_blog(ctx.page_mut(), &title).await?;
        expect(ctx.page(), Locator::text(title.as_str()))
            .to_be_hidden()
            .await?;

        let confirmed = ctx.dialogs().last_dialog().is_some_and(|d| {
            d.kind() == DialogKind::Confirm && d.action() == &DialogAction::Accept
        });
        if !confirmed {
            return Err(ProbeError::assertion(
                "deletion was not confirmed through a dialog",
            ));
        }
        if ctx.is_intercepting() && ctx.store_snapshot().iter().any(|b| b.title == title) {
            return Err(ProbeError::assertion(format!(
                "intercepted store still holds {title:?}"
            )));
        }
        ctx.transition(ScenarioState::Deleted)
    })
}

/// Log in as the seeded user and wait for the banner
async fn log_in<D: PageDriver>(ctx: &mut ScenarioContext<D>) -> ProbeResult<()> {
    let user = ctx.user().clone();
    login_with(ctx.page_mut(), &user.username, &user.password).await?;
    expect(ctx.page(), Locator::text(user.logged_in_banner()))
        .to_be_visible()
        .await?;
    ctx.transition(ScenarioState::Authenticated)
}
