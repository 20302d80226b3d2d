mod click_locators;
