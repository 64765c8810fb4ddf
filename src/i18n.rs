//! User-facing messages in every supported language.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Language used for domain error messages.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "en")]
    English,
    #[serde(rename = "uz")]
    Uzbek,
}

/// Domain messages returned to API consumers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Message {
    BirthYearOutOfRange,
    InvalidCredentials,
    CredentialsRequired,
    SamePassword,
    WrongOldPassword,
    EmailNotFound,
    UserNotFound,
    UsernameTaken,
    InvalidUsername,
    PasswordTooShort { min_length: usize },
    PasswordEntirelyNumeric,
    PasswordTooWeak,
    InvalidOtpCode,
    InvalidResetToken,
    ResetTokenNotVerified,
    ResetTokenExpired,
    InvalidAvatar,
    UnsupportedImage,
}

impl Message {
    /// Render message for `locale`.
    pub fn translate(self, locale: Locale) -> Cow<'static, str> {
        use Locale::*;
        use Message::*;

        match (self, locale) {
            (BirthYearOutOfRange, English) => "Birth year is outside of the allowed range.".into(),
            (BirthYearOutOfRange, Uzbek) => "Tug'ilgan yil ruxsat etilgan oraliqdan tashqarida.".into(),
            (InvalidCredentials, English) => "Invalid login credentials.".into(),
            (InvalidCredentials, Uzbek) => "Kirish maʼlumotlari notoʻgʻri".into(),
            (CredentialsRequired, English) => "Both username and password are required.".into(),
            (CredentialsRequired, Uzbek) => "Foydalanuvchi nomi va parol ham talab qilinadi".into(),
            (SamePassword, English) => "New and old passwords must not be the same.".into(),
            (SamePassword, Uzbek) => "Yangi va eski parollar bir xil bo'lmasligi kerak".into(),
            (WrongOldPassword, English) => "Your old password was entered incorrectly.".into(),
            (WrongOldPassword, Uzbek) => "Eski parol noto'g'ri kiritildi.".into(),
            (EmailNotFound, English) => "No user was found with this email.".into(),
            (EmailNotFound, Uzbek) => "Bu email bilan foydalanuvchi topilmadi".into(),
            (UserNotFound, English) => "User not found.".into(),
            (UserNotFound, Uzbek) => "Foydalanuvchi topilmadi.".into(),
            (UsernameTaken, English) => "A user with that username already exists.".into(),
            (UsernameTaken, Uzbek) => "Bu foydalanuvchi nomi allaqachon band.".into(),
            (InvalidUsername, English) => {
                "Username may contain only letters, numbers, and @/./+/-/_ characters.".into()
            },
            (InvalidUsername, Uzbek) => {
                "Foydalanuvchi nomi faqat harflar, raqamlar va @/./+/-/_ belgilaridan iborat bo'lishi mumkin.".into()
            },
            (PasswordTooShort { min_length }, English) => format!(
                "This password is too short. It must contain at least {min_length} characters."
            )
            .into(),
            (PasswordTooShort { min_length }, Uzbek) => format!(
                "Parol juda qisqa. U kamida {min_length} ta belgidan iborat bo'lishi kerak."
            )
            .into(),
            (PasswordEntirelyNumeric, English) => "This password is entirely numeric.".into(),
            (PasswordEntirelyNumeric, Uzbek) => "Parol faqat raqamlardan iborat.".into(),
            (PasswordTooWeak, English) => "This password is too weak.".into(),
            (PasswordTooWeak, Uzbek) => "Parol juda zaif.".into(),
            (InvalidOtpCode, English) => "The verification code is invalid or has expired.".into(),
            (InvalidOtpCode, Uzbek) => "Tasdiqlash kodi noto'g'ri yoki muddati o'tgan.".into(),
            (InvalidResetToken, English) => "Invalid password reset token.".into(),
            (InvalidResetToken, Uzbek) => "Parolni tiklash tokeni noto'g'ri.".into(),
            (ResetTokenNotVerified, English) => "Password reset token is not verified.".into(),
            (ResetTokenNotVerified, Uzbek) => "Parolni tiklash tokeni tasdiqlanmagan.".into(),
            (ResetTokenExpired, English) => "Password reset token has expired.".into(),
            (ResetTokenExpired, Uzbek) => "Parolni tiklash tokenining muddati tugagan.".into(),
            (InvalidAvatar, English) => "Avatar must reference one of your uploaded images.".into(),
            (InvalidAvatar, Uzbek) => "Avatar siz yuklagan rasmlardan biriga ishora qilishi kerak.".into(),
            (UnsupportedImage, English) => "Avatar must be a PNG, JPEG, GIF or WebP image.".into(),
            (UnsupportedImage, Uzbek) => "Avatar PNG, JPEG, GIF yoki WebP rasm bo'lishi kerak.".into(),
        }
    }

    /// Stable machine-readable code, used as [`validator::ValidationError`] code.
    pub fn code(self) -> &'static str {
        match self {
            Message::BirthYearOutOfRange => "birth_year_range",
            Message::InvalidCredentials => "invalid_credentials",
            Message::CredentialsRequired => "credentials_required",
            Message::SamePassword => "same_password",
            Message::WrongOldPassword => "wrong_password",
            Message::EmailNotFound => "email_not_found",
            Message::UserNotFound => "user_not_found",
            Message::UsernameTaken => "unique",
            Message::InvalidUsername => "invalid_username",
            Message::PasswordTooShort { .. } => "password_too_short",
            Message::PasswordEntirelyNumeric => "password_entirely_numeric",
            Message::PasswordTooWeak => "password_too_weak",
            Message::InvalidOtpCode => "invalid_otp",
            Message::InvalidResetToken => "invalid_token",
            Message::ResetTokenNotVerified => "token_not_verified",
            Message::ResetTokenExpired => "token_expired",
            Message::InvalidAvatar => "invalid_avatar",
            Message::UnsupportedImage => "unsupported_image",
        }
    }

    /// Build a [`validator::ValidationError`] carrying this message.
    pub fn to_error(self, locale: Locale) -> validator::ValidationError {
        validator::ValidationError::new(self.code()).with_message(self.translate(locale))
    }
}
